//! gitbatch binary entry point.

use gitbatch::ui::output;

fn main() {
    if let Err(err) = gitbatch::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}

use std::process::ExitCode;

use model2ts::Language;

fn main() -> ExitCode {
    model2ts::app::main(Language::Go)
}

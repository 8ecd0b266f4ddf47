use std::process::ExitCode;

fn main() -> ExitCode {
    cleanquote_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    match conduitd::run_bridge() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("conduitd: {error}");
            ExitCode::FAILURE
        }
    }
}

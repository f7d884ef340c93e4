//! Prints its arguments as a JSON array and exits with the code given by an
//! `--exit=<n>` argument, if any.

use std::ffi::OsString;

pub fn run(args: Vec<OsString>) -> i32 {
    let args: Vec<String> = args
        .into_iter()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let code = args
        .iter()
        .find_map(|arg| arg.strip_prefix("--exit="))
        .and_then(|code| code.parse().ok())
        .unwrap_or(0);

    match serde_json::to_string(&args) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("Error: {err}");
            return 1;
        }
    }
    if code != 0 {
        eprintln!("exiting with {code}");
    }
    code
}

use std::io::{BufRead, Write};

use serde::Serialize;
use tsnd_device::Confirm;

use crate::cmd::{finish, ClearArgs, ConnectArgs};
use crate::exit::{device_error, CliResult, FAILURE, SUCCESS};
use crate::output::{print_record, OutputFormat};

/// Asks on stderr, reads the answer from stdin. Anything but y/yes declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        eprint!("{prompt} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[derive(Serialize)]
struct ClearOutput {
    cleared: bool,
}

pub fn run(args: ClearArgs, connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let cleared = if args.yes {
        device.clear_saved_entry_confirmed(&mut true)
    } else {
        device.clear_saved_entry_confirmed(&mut StdinConfirm)
    }
    .map_err(|err| device_error("clear failed", err))?;

    print_record(
        &ClearOutput { cleared },
        &[("cleared", cleared.to_string())],
        format,
    );
    finish(device, if cleared { SUCCESS } else { FAILURE })
}

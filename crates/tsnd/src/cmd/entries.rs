use crate::cmd::{finish, ConnectArgs};
use crate::exit::{device_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_entries, OutputFormat};

pub fn run(connect: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect.open()?;
    let entries = device
        .list_saved_entries()
        .map_err(|err| device_error("listing entries failed", err))?
        .ok_or_else(|| CliError::new(FAILURE, "device is recording; stop it first"))?;

    print_entries(&entries, format);
    finish(device, SUCCESS)
}

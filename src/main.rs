use covdeck::{cli::parse_cli, errors::CovError};

fn main() -> Result<(), CovError> {
    parse_cli()
}

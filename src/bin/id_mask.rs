use std::str::FromStr;

use quadstore::models::id::RowId;
use quadstore::models::statement::Statement;

fn main() {
    let mut args = std::env::args();
    let _ = args.next(); // Pop the command name off the args list.

    let cmd = args.next().unwrap_or_else(|| {
        eprintln!("Must pass encode or decode, then a value.");
        std::process::exit(1);
    });
    let value = args.next().unwrap_or_else(|| {
        eprintln!("Must pass encode or decode, then a value.");
        std::process::exit(2);
    });

    match &*cmd {
        "encode" => encode(value),
        "decode" => decode(value),
        other => {
            eprintln!(
                "Command not recognized: {}. Must pass encode or decode, then a value.",
                other
            );
            std::process::exit(2);
        }
    }
}

fn parse(value: &str) -> RowId<Statement> {
    let raw = i64::from_str_radix(value, 10).expect("Value to be an i64");
    RowId::new(raw)
}

fn encode(value: String) {
    println!("{}", parse(&value).value());
}

fn decode(value: String) {
    println!("{:?}", parse(&value));
}

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        PossibleValuesParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = if let Some(hash) = built_info::GIT_COMMIT_HASH {
    hash
} else {
    ":-("
};

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("ts_exporter")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(GIT_COMMIT_HASH)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("auth")
                .long("auth")
                .help("Endpoints as 'url=<dsn>,user=<name>,pswd=<secret>' records separated by '^'")
                .env("TS_EXPORTER_AUTH")
                .hide_env_values(true)
                .value_name("RECORDS")
                .required(true),
        )
        .arg(
            Arg::new("step")
                .short('s')
                .long("step")
                .help("Collection interval in seconds")
                .default_value("60")
                .env("TS_EXPORTER_STEP")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("activate-type")
                .long("activate-type")
                .help("auto: run if the endpoints answer at startup, force: always run, disabled: never run")
                .default_value("auto")
                .env("TS_EXPORTER_ACTIVATE_TYPE")
                .ignore_case(true)
                .value_parser(PossibleValuesParser::new(["auto", "force", "disabled"])),
        )
        .arg(
            Arg::new("push-url")
                .long("push-url")
                .help("Push records to this URL (e.g. http://127.0.0.1:1988/v1/push) instead of stdout")
                .env("TS_EXPORTER_PUSH_URL")
                .value_name("URL"),
        )
        .arg(
            Arg::new("hostname")
                .long("hostname")
                .help("Endpoint name reported with every record [default: system host name]")
                .env("TS_EXPORTER_HOSTNAME"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(ArgAction::Count),
        )
}

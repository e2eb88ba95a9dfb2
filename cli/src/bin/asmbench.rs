use asmbench_cli::pipeline::{context_from_matches, init_logger, run_pipeline};
use readsim::{Mode, SimulationContext};
#[macro_use]
extern crate log;

fn main() {
    let matches = asmbench_cli::asmbench_commands::asmbench_parser().get_matches();
    let ctx = match matches.subcommand() {
        Some(("pipeline", sub_m)) => {
            let path: &String = sub_m.get_one("profile").expect("profile is required");
            SimulationContext::from_toml_file(path).map(|ctx| match sub_m.get_count("verbose") {
                0 => ctx,
                verbose => SimulationContext {
                    verbose: verbose as usize,
                    ..ctx
                },
            })
        }
        Some((name, sub_m)) => name
            .parse::<Mode>()
            .and_then(|mode| context_from_matches(mode, sub_m)),
        None => unreachable!("a subcommand is required"),
    };
    let ctx = match ctx {
        Ok(ctx) => ctx,
        Err(why) => {
            eprintln!("Error: {why}");
            std::process::exit(1);
        }
    };
    init_logger(ctx.verbose);
    if let Err(why) = run_pipeline(&ctx) {
        error!("{why}");
        eprintln!("Error: {why}");
        std::process::exit(1);
    }
}

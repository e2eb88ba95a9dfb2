use clap::{value_parser, Arg, ArgAction, Command};

fn common_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("verbose")
            .short('v')
            .action(ArgAction::Count)
            .help("Debug mode"),
    )
    .arg(
        Arg::new("threads")
            .short('t')
            .long("threads")
            .value_parser(value_parser!(usize))
            .default_value("1")
            .help("number of threads"),
    )
    .arg(
        Arg::new("seed")
            .short('s')
            .long("seed")
            .value_parser(value_parser!(u64).range(..=readsim::config::MAX_SEED))
            .default_value("0")
            .help("Seed of the random generator. 0 takes one from the clock."),
    )
    .arg(
        Arg::new("prefix")
            .short('o')
            .long("prefix")
            .value_name("PREFIX")
            .default_value("noid")
            .help("Output files are written as <PREFIX>.<artifact>."),
    )
}

fn simulation_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("region")
            .short('r')
            .long("region")
            .value_name("REGION")
            .required(true)
            .help("BED file or locus like chr17:7,565,721-7,575,000 (1-based, inclusive)."),
    )
    .arg(
        Arg::new("reference")
            .short('g')
            .long("reference")
            .value_name("FASTA")
            .required(true)
            .help("Reference genome. Needs a .fai index."),
    )
    .arg(
        Arg::new("coverages")
            .short('c')
            .long("coverages")
            .default_value("10")
            .help("Comma-separated coverages."),
    )
    .arg(
        Arg::new("snv_rates")
            .short('e')
            .long("snv-rates")
            .default_value("0.01")
            .help("Comma-separated per-base substitution rates."),
    )
    .arg(
        Arg::new("ins_rates")
            .short('I')
            .long("ins-rates")
            .default_value("0.05")
            .help("Comma-separated per-read insertion rates."),
    )
    .arg(
        Arg::new("del_rates")
            .short('D')
            .long("del-rates")
            .default_value("0.05")
            .help("Comma-separated per-read deletion rates."),
    )
    .arg(
        Arg::new("read_len")
            .short('l')
            .long("read-len")
            .value_parser(value_parser!(usize))
            .default_value("101"),
    )
    .arg(
        Arg::new("quality")
            .short('q')
            .long("quality")
            .value_name("FASTQ")
            .help("FASTQ file to learn quality strings from. Q40 everywhere if not given."),
    )
}

fn subcommand_assembly_test() -> Command {
    let cmd = Command::new("assembly-test")
        .version("0.2")
        .author("Bansho Masutani")
        .about("Sweep coverage, error rates and k-mer correction, assemble, and score.")
        .arg(
            Arg::new("num_trials")
                .short('n')
                .long("num-trials")
                .value_parser(value_parser!(usize))
                .default_value("100"),
        )
        .arg(
            Arg::new("correction")
                .long("correction")
                .value_parser(["both", "on", "off"])
                .default_value("both")
                .help("Sweep with k-mer correction on, off, or both."),
        )
        .arg(
            Arg::new("kmer_size")
                .short('k')
                .long("kmer-size")
                .value_parser(value_parser!(usize))
                .default_value("21"),
        )
        .arg(
            Arg::new("min_count")
                .long("min-count")
                .value_parser(value_parser!(u32))
                .default_value("3")
                .help("k-mers seen fewer times are treated as errors."),
        )
        .arg(
            Arg::new("min_overlap")
                .long("min-overlap")
                .value_parser(value_parser!(usize))
                .default_value("35"),
        )
        .arg(
            Arg::new("id")
                .long("id")
                .default_value("noid")
                .help("Identifier handed to the assembler."),
        )
        .arg(
            Arg::new("aligner")
                .long("aligner")
                .default_value("minimap2")
                .help("minimap2 executable."),
        )
        .arg(
            Arg::new("assembler")
                .long("assembler")
                .value_name("PROGRAM")
                .required(true)
                .help("Assembler. Run as PROGRAM [ARGS] -i ID -e ERR -m OVERLAP -l LEN reads.fa"),
        )
        .arg(
            Arg::new("assembler_arg")
                .long("assembler-arg")
                .action(ArgAction::Append)
                .allow_hyphen_values(true)
                .help("Extra argument to the assembler. Can be repeated."),
        );
    simulation_args(common_args(cmd))
}

fn subcommand_sim_breaks() -> Command {
    let cmd = Command::new("sim-breaks")
        .version("0.2")
        .author("Bansho Masutani")
        .about("Simulate rearrangements and indels in a region, then paired-end reads.")
        .arg(
            Arg::new("num_breaks")
                .short('b')
                .long("num-breaks")
                .value_parser(value_parser!(usize))
                .default_value("10"),
        )
        .arg(
            Arg::new("num_indels")
                .short('i')
                .long("num-indels")
                .value_parser(value_parser!(usize))
                .default_value("10")
                .help("Target number of indels. Fewer may be placed."),
        )
        .arg(
            Arg::new("insert_mean")
                .long("insert-mean")
                .value_parser(value_parser!(f64))
                .default_value("250"),
        )
        .arg(
            Arg::new("insert_sd")
                .long("insert-sd")
                .value_parser(value_parser!(f64))
                .default_value("50"),
        );
    simulation_args(common_args(cmd))
}

fn subcommand_split_reads() -> Command {
    let cmd = Command::new("split-reads")
        .version("0.2")
        .author("Bansho Masutani")
        .about("Split paired FASTQ files into disjoint random subsets.")
        .arg(
            Arg::new("read1")
                .short('1')
                .long("read1")
                .value_name("FASTQ")
                .required(true),
        )
        .arg(
            Arg::new("read2")
                .short('2')
                .long("read2")
                .value_name("FASTQ")
                .required(true),
        )
        .arg(
            Arg::new("fractions")
                .short('f')
                .long("fractions")
                .required(true)
                .help("Comma-separated fractions, summing to at most 1."),
        );
    common_args(cmd)
}

fn subcommand_pipeline() -> Command {
    Command::new("pipeline")
        .version("0.2")
        .author("Bansho Masutani")
        .about("Run based on the given TOML file.")
        .arg(
            Arg::new("profile")
                .short('p')
                .required(true)
                .help("TOML configuration file. Unset fields take their defaults."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Debug mode. Overrides the profile."),
        )
}

pub fn asmbench_parser() -> Command {
    Command::new("asmbench")
        .version("0.2")
        .author("Bansho Masutani <ban-m@g.ecc.u-tokyo.ac.jp>")
        .about("Simulated reads and local assembly benchmark")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(subcommand_assembly_test())
        .subcommand(subcommand_sim_breaks())
        .subcommand(subcommand_split_reads())
        .subcommand(subcommand_pipeline())
}

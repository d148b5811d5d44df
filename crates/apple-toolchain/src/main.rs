use std::path::PathBuf;

use apple_toolchain::spec::DEFAULT_LINKER_VERSION;
use apple_toolchain::GenerateConfig;
use clap::Parser;

/// Create a standalone clang/cctools toolchain for macOS or iOS targets
#[derive(Parser, Debug)]
#[command(name = "make-apple-toolchain", version, about)]
struct Cli {
    /// Apple SDK directory or tarball (.tar.xz, .tar.gz, .tar.bz2, .tar)
    #[arg(long)]
    sdk: PathBuf,

    /// Target architecture
    #[arg(long, value_parser = ["x86", "x86_64", "arm", "arm64"])]
    arch: String,

    /// Destination directory; wrappers go to `<install-dir>/bin`
    #[arg(long)]
    install_dir: PathBuf,

    /// Target platform (defaults to ios for arm/arm64, macosx otherwise)
    #[arg(long, value_parser = ["macosx", "ios"])]
    platform: Option<String>,

    /// Minimum OS version (defaults to 10.6 on macosx, 4.0 on ios)
    #[arg(long)]
    min_version: Option<String>,

    /// Base C compiler
    #[arg(long, default_value = "clang")]
    clang: PathBuf,

    /// Base C++ compiler (defaults to the --clang value followed by `++`)
    #[arg(long)]
    clangxx: Option<PathBuf>,

    /// Directory holding the cctools-port binaries (default: search PATH for
    /// `<arch>-apple-darwin11-<tool>`)
    #[arg(long, env = "CCTOOLS_DIR")]
    cctools_dir: Option<PathBuf>,

    /// ld64 version reported to clang through -mlinker-version
    #[arg(long, default_value = DEFAULT_LINKER_VERSION)]
    linker_version: String,

    /// More output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Overwrite a non-empty install directory
    #[arg(short, long)]
    force: bool,
}

impl From<Cli> for GenerateConfig {
    fn from(cli: Cli) -> Self {
        let mut config = GenerateConfig::new(cli.sdk, cli.arch, cli.install_dir);
        config.platform = cli.platform;
        config.min_version = cli.min_version;
        config.clang = cli.clang;
        config.clangxx = cli.clangxx;
        config.cctools_dir = cli.cctools_dir;
        config.linker_version = cli.linker_version;
        config.force = cli.force;
        config
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let generated = apple_toolchain::generate(&cli.into())?;
    let target = generated.spec.target();
    println!(
        "Created {} toolchain ({} wrappers, SDK at {})",
        target.target_triple(),
        generated.wrappers.len(),
        generated.sdk_dir.display()
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

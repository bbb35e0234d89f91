use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use keyshell::geom::{GeomMesh, write_obj};
use keyshell::keyboard::{KeyboardConfig, SwitchKind, build_keyboard_mesh};

const USAGE: &str = r"keyshell_cli

USAGE:
  keyshell_cli build [options]
  keyshell_cli config [--config <file.json>] [--switch choc|mx]
  keyshell_cli help

OPTIONS (build):
  --config <path>    Read keyboard parameters from a JSON file
  --switch <kind>    Switch family: choc (default) or mx
  --keycaps          Add keycap previews
  --rows <n>         Keys per column
  --obj <path>       Write the shell as OBJ
  --overwrite        Overwrite an existing OBJ file
  -h, --help         Show this help
";

enum Failure {
    /// Bad command line; exit code 2.
    Usage(String),
    /// Invalid configuration or failed build; exit code 1.
    Build(String),
}

fn main() {
    init_logger();
    match run() {
        Ok(()) => {}
        Err(Failure::Usage(err)) => {
            eprintln!("keyshell_cli: {err}");
            std::process::exit(2);
        }
        Err(Failure::Build(err)) => {
            eprintln!("keyshell_cli error: {err}");
            std::process::exit(1);
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "debug_logs")] {
        fn init_logger() {
            env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Debug)
                .init();
        }
    } else {
        fn init_logger() {
            // silent without debug_logs
        }
    }
}

fn run() -> Result<(), Failure> {
    let mut args = Args::new(std::env::args().skip(1).collect());

    let Some(command) = args.next() else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "build" => cmd_build(&mut args),
        "config" => cmd_config(&mut args),
        "-h" | "--help" | "help" => {
            print_usage();
            Ok(())
        }
        other => Err(Failure::Usage(format!("unknown command `{other}`\n\n{USAGE}"))),
    }
}

fn print_usage() {
    println!("{USAGE}");
}

#[derive(Default)]
struct BuildOptions {
    config: Option<PathBuf>,
    switch: Option<SwitchKind>,
    keycaps: bool,
    rows: Option<usize>,
    obj: Option<PathBuf>,
    overwrite: bool,
    help: bool,
}

fn parse_options(args: &mut Args, allow_build_flags: bool) -> Result<BuildOptions, String> {
    let mut options = BuildOptions::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => options.config = Some(PathBuf::from(args.value("--config")?)),
            "--switch" => options.switch = Some(args.value("--switch")?.parse()?),
            "--keycaps" if allow_build_flags => options.keycaps = true,
            "--rows" if allow_build_flags => {
                let value = args.value("--rows")?;
                let rows = value
                    .parse()
                    .map_err(|_| format!("--rows expects a whole number, got `{value}`"))?;
                options.rows = Some(rows);
            }
            "--obj" if allow_build_flags => options.obj = Some(PathBuf::from(args.value("--obj")?)),
            "--overwrite" if allow_build_flags => options.overwrite = true,
            "-h" | "--help" => options.help = true,
            other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
        }
    }
    Ok(options)
}

fn load_config(options: &BuildOptions) -> Result<KeyboardConfig, Failure> {
    let mut config = match options.config.as_deref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| Failure::Build(format!("read {}: {e}", path.display())))?;
            KeyboardConfig::from_json_str(&text)
                .map_err(|e| Failure::Build(format!("parse {}: {e}", path.display())))?
        }
        None => KeyboardConfig::default(),
    };
    if let Some(switch) = options.switch {
        config = config.with_switch(switch);
    }
    if options.keycaps {
        config = config.with_keycaps(true);
    }
    if let Some(rows) = options.rows {
        config = config.with_rows(rows);
    }
    Ok(config)
}

fn cmd_build(args: &mut Args) -> Result<(), Failure> {
    let options = parse_options(args, true).map_err(Failure::Usage)?;
    if options.help {
        print_usage();
        return Ok(());
    }
    if let Some(path) = options.obj.as_deref() {
        if path.exists() && !options.overwrite {
            return Err(Failure::Build(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            )));
        }
    }

    let config = load_config(&options)?;
    let (model, diagnostics) =
        build_keyboard_mesh(config).map_err(|e| Failure::Build(e.to_string()))?;

    let stats = model.stats;
    eprintln!(
        "keys={} columns={} fillers={}+{} | {}",
        stats.key_count,
        stats.column_count,
        stats.intra_column_fillers,
        stats.inter_column_fillers,
        diagnostics.summary()
    );
    for warning in &diagnostics.warnings {
        eprintln!("  warning: {warning}");
    }
    log::debug!("{diagnostics}");

    if let Some(path) = options.obj.as_deref() {
        write_obj_file(path, &model.solid, options.overwrite).map_err(Failure::Build)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_config(args: &mut Args) -> Result<(), Failure> {
    let options = parse_options(args, false).map_err(Failure::Usage)?;
    if options.help {
        print_usage();
        return Ok(());
    }
    let config = load_config(&options)?;
    let json = config
        .to_json_pretty()
        .map_err(|e| Failure::Build(format!("serialize config: {e}")))?;
    println!("{json}");
    Ok(())
}

fn write_obj_file(path: &Path, mesh: &GeomMesh, overwrite: bool) -> Result<(), String> {
    mesh.validate()
        .map_err(|e| format!("mesh validation failed: {e}"))?;

    if path.exists() && !overwrite {
        return Err(format!(
            "refusing to overwrite existing file {} (use --overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
    }

    let file = File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?;
    let mut w = BufWriter::new(file);
    write_obj(&mut w, mesh, "keyboard").map_err(|e| format!("write obj: {e}"))?;
    w.flush().map_err(|e| format!("write obj: {e}"))
}

struct Args {
    args: Vec<String>,
    pos: usize,
}

impl Args {
    fn new(args: Vec<String>) -> Self {
        Self { args, pos: 0 }
    }

    fn next(&mut self) -> Option<String> {
        let arg = self.args.get(self.pos)?.clone();
        self.pos += 1;
        Some(arg)
    }

    fn value(&mut self, flag: &str) -> Result<String, String> {
        self.next()
            .ok_or_else(|| format!("missing value for {flag}"))
    }
}

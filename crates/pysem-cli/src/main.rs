use std::{env, fs, path::Path, process::ExitCode, time::Instant};

use pysem_core::{diagnostics::RecordingDiagnostics, member::{Member, MemberContainer}, version::PythonVersion};
use pysem_resolver::{ImportStatus, Resolver, ResolverConfig};

/// Thin demonstration binary (§6): wires a toy search-path resolver around
/// whatever directory the target file lives in, resolves it as a module, and
/// prints its public symbol table. Not a substitute for a real project
/// configuration loader — see `ResolverConfig`'s own doc comment.
fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.py" };

    if let Err(err) = read_file(file_path) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    run(file_path)
}

fn run(file_path: &str) -> ExitCode {
    let path = Path::new(file_path);
    let Some(module_name) = path.file_stem().and_then(|stem| stem.to_str()) else {
        eprintln!("error: {file_path} has no usable module name");
        return ExitCode::FAILURE;
    };
    let search_root = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));

    let config = ResolverConfig::new(PythonVersion::new(3, 11)).with_search_paths([search_root.to_path_buf()]);
    let resolver = Resolver::new(config);

    let start = Instant::now();
    let mut diagnostics = RecordingDiagnostics::new();
    let status = resolver.import_with_diagnostics(module_name, &mut diagnostics);
    let elapsed = start.elapsed();

    match status {
        ImportStatus::Success(Member::Module(module)) => {
            let mut names = module.public_names();
            names.sort();
            println!("module {module_name}: {} public member(s)", names.len());
            for name in &names {
                if let Some(member) = module.get_member(name) {
                    println!("  {name}: {}", member.kind());
                }
            }
            eprintln!("resolved in {elapsed:?}, {} diagnostic event(s)", diagnostics.events().len());
            ExitCode::SUCCESS
        }
        ImportStatus::Success(other) => {
            eprintln!("error: {module_name} resolved to a non-module member: {other:?}");
            ExitCode::FAILURE
        }
        ImportStatus::ModuleNotFound => {
            eprintln!("error: could not resolve module {module_name}");
            ExitCode::FAILURE
        }
        ImportStatus::NeedRetry | ImportStatus::Timeout | ImportStatus::NotSupported => {
            eprintln!("error: import of {module_name} did not complete: {status:?}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("Reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("Error: {file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("Error reading {file_path}: {err}"));
        }
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => Ok(contents),
        Err(err) => Err(format!("Error reading file: {err}")),
    }
}

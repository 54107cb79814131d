//! CLI command implementations.

use std::path::PathBuf;

use crate::colors;
use crate::exit_codes::ExitCode;
use crate::TranscribeArgs;
use sotto_common::{TranscribeOptions, TranscriptionResult};
use sotto_engine::audio::wav::{encode_wav, WavSampleFormat};
use sotto_engine::module::bootstrap;
use sotto_engine::{audio, model, EngineConfig, EngineError, TranscriptionService};

/// Transcribe a single audio file.
pub async fn transcribe(file: String, args: TranscribeArgs, json: bool, quiet: bool) -> ExitCode {
    let path = PathBuf::from(shellexpand::tilde(&file).into_owned());
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!(
                "{}",
                colors::error(&format!("cannot read {}: {}", path.display(), e))
            );
            return ExitCode::InvalidArguments;
        }
    };
    let hint = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase());

    if let Some(out) = &args.save_audio {
        match audio::normalize(&bytes, hint.as_deref()) {
            Ok(buf) => {
                let wav = encode_wav(&buf, WavSampleFormat::Int16);
                if let Err(e) = std::fs::write(out, &wav) {
                    eprintln!("{}", colors::error(&format!("cannot write {}: {}", out, e)));
                    return ExitCode::GeneralError;
                }
                if !quiet {
                    eprintln!(
                        "{}",
                        colors::dim(&format!("normalized audio written to {}", out))
                    );
                }
            }
            Err(e) => {
                eprintln!("{}", colors::error(&e.to_string()));
                return ExitCode::DecodeFailed;
            }
        }
    }

    // File config first, command-line overrides on top
    let mut config = EngineConfig::load_default();
    if let Some(m) = args.model {
        config.model = Some(shellexpand::tilde(&m).into_owned());
    }
    if let Some(m) = args.module {
        config.module_path = Some(PathBuf::from(shellexpand::tilde(&m).into_owned()));
    }
    let opts = TranscribeOptions {
        language: args.language,
        translate: args.translate,
        threads: args.threads,
    };

    // The foreign call is synchronous and has no cancellation primitive;
    // run it on a blocking thread and let Ctrl+C explain that rather
    // than pretend to abort.
    let mut task = tokio::task::spawn_blocking(move || {
        let service = TranscriptionService::new(config);
        let result = service.transcribe(&bytes, hint.as_deref(), &opts);
        service.close();
        result
    });

    let result = tokio::select! {
        result = &mut task => result,
        _ = tokio::signal::ctrl_c() => {
            if !quiet {
                eprintln!(
                    "{}",
                    colors::warning(
                        "transcription cannot be cancelled mid-call; waiting for the module to finish"
                    )
                );
            }
            (&mut task).await
        }
    };

    match result {
        Ok(result) => finish_transcription(result, json, quiet),
        Err(e) => {
            eprintln!("{}", colors::error(&format!("worker thread failed: {}", e)));
            ExitCode::GeneralError
        }
    }
}

fn finish_transcription(
    result: Result<TranscriptionResult, EngineError>,
    json: bool,
    quiet: bool,
) -> ExitCode {
    match result {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result).unwrap());
            } else {
                println!("{}", result.text);
                if !quiet {
                    eprintln!(
                        "{}",
                        colors::dim(&format!(
                            "{:.1}s of audio, {} segment(s), confidence {:.2}",
                            result.duration_ms as f64 / 1000.0,
                            result.segments.len(),
                            result.confidence
                        ))
                    );
                }
            }
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("{}", colors::error(&e.to_string()));
            ExitCode::from_engine_error(&e)
        }
    }
}

/// Model cache directory, honoring the config file override.
fn configured_model_dir() -> PathBuf {
    EngineConfig::load_default()
        .model_dir
        .unwrap_or_else(model::default_model_dir)
}

/// List cached model binaries.
pub fn models_list(json: bool, quiet: bool) -> ExitCode {
    let dir = configured_model_dir();
    let models = match model::installed_models(&dir) {
        Ok(models) => models,
        Err(e) => {
            eprintln!("{}", colors::error(&format!("cannot list models: {}", e)));
            return ExitCode::GeneralError;
        }
    };

    if json {
        let entries: Vec<serde_json::Value> = models
            .iter()
            .map(|m| {
                serde_json::json!({
                    "name": m.name,
                    "size_bytes": m.size_bytes,
                    "modified": m.modified.to_rfc3339(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries).unwrap());
        return ExitCode::Success;
    }

    if models.is_empty() {
        if !quiet {
            println!("{}", colors::dim("No models cached."));
            println!(
                "{}",
                colors::dim(&format!(
                    "Fetch one with: sotto models fetch {}",
                    model::DEFAULT_MODEL_NAMES[model::DEFAULT_MODEL_NAMES.len() - 1]
                ))
            );
        }
        return ExitCode::Success;
    }

    let name_width = models.iter().map(|m| m.name.len()).max().unwrap_or(4).max(4);
    println!(
        "{}  {}  {}",
        colors::pad_left("NAME", name_width, colors::header),
        colors::pad_left("SIZE", 10, colors::header),
        colors::header("MODIFIED")
    );
    for m in &models {
        println!(
            "{}  {}  {}",
            colors::pad_left(&m.name, name_width, colors::number),
            colors::pad_left(&format_size(m.size_bytes), 10, colors::dim),
            m.modified.format("%Y-%m-%d %H:%M")
        );
    }
    ExitCode::Success
}

/// Download a model into the local cache.
pub async fn models_fetch(name: String, json: bool, quiet: bool) -> ExitCode {
    let dir = configured_model_dir();
    let candidates = model::candidates_for(Some(&name), &dir);
    let asset = match candidates.into_iter().next() {
        Some(asset) => asset,
        None => {
            eprintln!("{}", colors::error("no candidate for that model name"));
            return ExitCode::InvalidArguments;
        }
    };

    if !quiet && !json {
        eprintln!(
            "{}",
            colors::dim(&format!("fetching {} (this may take a while)...", asset.name))
        );
    }

    let fetch_dir = dir.clone();
    let fetched =
        tokio::task::spawn_blocking(move || model::provision::prefetch(&asset, &fetch_dir)).await;

    match fetched {
        Ok(Ok(path)) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "path": path.display().to_string() })
                );
            } else {
                println!("{}", colors::path(&path.display().to_string()));
            }
            ExitCode::Success
        }
        Ok(Err(e)) => {
            eprintln!("{}", colors::error(&e.to_string()));
            ExitCode::from_engine_error(&e)
        }
        Err(e) => {
            eprintln!("{}", colors::error(&format!("worker thread failed: {}", e)));
            ExitCode::GeneralError
        }
    }
}

/// Print the model cache directory.
pub fn models_dir() -> ExitCode {
    println!("{}", configured_model_dir().display());
    ExitCode::Success
}

/// Show module and model availability without transcribing.
pub fn status(json: bool) -> ExitCode {
    let config = EngineConfig::load_default();
    let module_path = bootstrap::resolve_module_path(&config);
    let module_present = module_path.exists();
    let model_dir = config
        .model_dir
        .clone()
        .unwrap_or_else(model::default_model_dir);
    let models = model::installed_models(&model_dir).unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "module_path": module_path.display().to_string(),
                "module_present": module_present,
                "model_dir": model_dir.display().to_string(),
                "models_cached": models.len(),
            }))
            .unwrap()
        );
        return ExitCode::Success;
    }

    println!("{}", colors::header("Sotto engine status"));
    println!(
        "  module:     {} ({})",
        colors::path(&module_path.display().to_string()),
        if module_present {
            colors::yes()
        } else {
            colors::no()
        }
    );
    println!(
        "  model dir:  {}",
        colors::path(&model_dir.display().to_string())
    );
    println!(
        "  cached:     {} model(s)",
        colors::number(&models.len().to_string())
    );
    if !module_present {
        println!(
            "{}",
            colors::dim(&format!(
                "  hint: place {} next to the executable or set {}",
                bootstrap::module_file_name(),
                bootstrap::MODULE_PATH_ENV
            ))
        );
    }
    ExitCode::Success
}

/// Show version information.
pub fn version(json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "name": "sotto",
                "version": env!("CARGO_PKG_VERSION"),
            })
        );
    } else {
        println!("sotto {}", env!("CARGO_PKG_VERSION"));
    }
}

/// Human-readable byte size.
fn format_size(bytes: u64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else {
        format!("{:.0} KB", bytes / 1024.0)
    }
}

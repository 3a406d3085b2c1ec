use clap::Parser;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use cinegen::{
    cli::{describe_result, CliOptions, Command, GenerateArgs, SessionArgs, StudioCommand, STUDIO_HELP},
    logger,
    EnvKeySelector, GeminiClient, GeminiConfig, KeySelector, KeyStore, ModelTier, PromptKeySelector,
    ReferenceImage, Studio, StudioConfig,
};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = CliOptions::parse();

    if let Err(e) = logger::init_with_config(cli.logger_config()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    if dotenv_loaded {
        log::debug!("✅ .env file loaded");
    }

    let result = match cli.command {
        Command::Models => {
            print_models();
            Ok(())
        }
        Command::Generate(args) => run_generate(args).await,
        Command::Studio(args) => run_studio(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn print_models() {
    for info in ModelTier::supported_models() {
        println!(
            "{:<6} {:<28} {}",
            format!("{:?}", info.tier).to_lowercase(),
            info.id,
            info.description
        );
    }
}

fn build_studio(
    studio_config: StudioConfig,
    ask_key: bool,
) -> Result<Studio, String> {
    let gemini_config = GeminiConfig::from_env();
    logger::log_config_info(&gemini_config, &studio_config);

    let keys = KeyStore::new(gemini_config.api_key.clone());
    let client = GeminiClient::with_key_store(gemini_config, keys.clone()).map_err(|e| e.to_string())?;

    let selector: Arc<dyn KeySelector> = if ask_key {
        Arc::new(PromptKeySelector::new(keys))
    } else {
        Arc::new(EnvKeySelector::new(keys))
    };

    Ok(Studio::new(Arc::new(client.image().clone()), selector, studio_config))
}

async fn run_generate(args: GenerateArgs) -> Result<(), String> {
    let mut studio_config = StudioConfig::from_env();
    if let Some(model) = args.model {
        studio_config = studio_config.with_model(model);
    }
    if let Some(ratio) = args.aspect_ratio {
        studio_config = studio_config.with_aspect_ratio(ratio);
    }
    if let Some(size) = args.size {
        studio_config = studio_config.with_image_size(size);
    }
    if let Some(prompt) = args.prompt {
        studio_config = studio_config.with_prompt(prompt);
    }
    if let Some(dir) = args.output {
        studio_config = studio_config.with_output_dir(dir);
    }

    let studio = build_studio(studio_config, args.ask_key)?;
    if let Some(path) = &args.reference {
        let image = ReferenceImage::from_path(path).map_err(|e| e.to_string())?;
        studio.set_reference_image(image);
    }

    if let Err(e) = studio.generate().await {
        return Err(studio.last_error().unwrap_or_else(|| e.to_string()));
    }
    let path = studio.save_current().map_err(|e| e.to_string())?;
    println!("{}", path.display());
    Ok(())
}

async fn run_studio(args: SessionArgs) -> Result<(), String> {
    let mut studio_config = StudioConfig::from_env();
    if let Some(model) = args.model {
        studio_config = studio_config.with_model(model);
    }
    if let Some(dir) = args.output {
        studio_config = studio_config.with_output_dir(dir);
    }

    let studio = build_studio(studio_config, true)?;
    if let Some(path) = &args.reference {
        let image = ReferenceImage::from_path(path).map_err(|e| e.to_string())?;
        studio.set_reference_image(image);
    }

    println!("{}", STUDIO_HELP);
    print_status(&studio);

    loop {
        let Some(line) = read_line("studio> ").await? else {
            break;
        };
        let command = match StudioCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            StudioCommand::Generate => {
                println!("Synthesizing with {}...", studio.model().label());
                match studio.generate().await {
                    Ok(result) => println!("{}", describe_result(0, &result)),
                    Err(e) => println!(
                        "✗ {}",
                        studio.last_error().unwrap_or_else(|| e.to_string())
                    ),
                }
            }
            StudioCommand::Model(model) => {
                studio.set_model(model);
                if model.requires_selected_key() {
                    println!("{} requires a billing-enabled project.", model.label());
                }
            }
            StudioCommand::Ratio(ratio) => studio.set_aspect_ratio(ratio),
            StudioCommand::Size(size) => {
                studio.set_image_size(size);
                if !studio.model().supports_image_size() {
                    println!("Note: {} ignores the output size.", studio.model().label());
                }
            }
            StudioCommand::Reference(path) => match ReferenceImage::from_path(&path) {
                Ok(image) => {
                    studio.set_reference_image(image);
                    println!("Reference loaded from {}", path.display());
                }
                Err(e) => println!("{}", e),
            },
            StudioCommand::ClearReference => studio.clear_reference_image(),
            StudioCommand::History => {
                let history = studio.history();
                if history.is_empty() {
                    println!("Studio empty.");
                }
                for (index, result) in history.iter().enumerate() {
                    println!("{}", describe_result(index, result));
                }
            }
            StudioCommand::Select(index) => match studio.select_history(index) {
                Ok(result) => println!("{}", describe_result(0, &result)),
                Err(e) => println!("{}", e),
            },
            StudioCommand::Save(dir) => {
                let saved = match dir {
                    Some(dir) => studio.save_current_to(dir),
                    None => studio.save_current(),
                };
                match saved {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(e) => println!("{}", e),
                }
            }
            StudioCommand::Status => print_status(&studio),
            StudioCommand::Models => print_models(),
            StudioCommand::Help => println!("{}", STUDIO_HELP),
            StudioCommand::Quit => break,
        }
    }
    Ok(())
}

fn print_status(studio: &Studio) {
    let model = studio.model();
    println!("engine:     {}", model.label());
    println!("ratio:      {}", studio.aspect_ratio());
    if model.supports_image_size() {
        println!("size:       {}", studio.image_size());
    }
    println!(
        "reference:  {}",
        studio
            .reference_image()
            .map(|image| image.mime_type)
            .unwrap_or_else(|| "none".to_string())
    );
    println!("history:    {} result(s)", studio.history().len());
    if let Some(error) = studio.last_error() {
        println!("last error: {}", error);
    }
}

/// Reads through std's shared stdin buffer so the terminal key prompt and
/// the session never split a line between two readers.
async fn read_line(prompt: &'static str) -> Result<Option<String>, String> {
    tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())
}

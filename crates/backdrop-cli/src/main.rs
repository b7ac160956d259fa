use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use backdrop_contracts::events::EventWriter;
use backdrop_contracts::gallery::Gallery;
use backdrop_contracts::prompts::{PromptChoice, OWN_PROMPT_LABEL, PRESET_PROMPTS};
use backdrop_contracts::session::{parse_command, SessionCommand, SESSION_HELP_COMMANDS};
use backdrop_engine::presenter::{render_gallery, render_page, terminal_lines, Presentation};
use backdrop_engine::{
    ImagelessPolicy, Studio, StudioConfig, Submission, SubmissionForm, SubmissionOutcome,
    UploadedImage,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

const DEFAULT_LOG_FILTER: &str = "warn,backdrop_cli=info,backdrop_engine=info";

#[derive(Debug, Parser)]
#[command(
    name = "backdrop",
    version,
    about = "Generate product-photo backgrounds with FLUX"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the prompt choices.
    Presets,
    /// Print the example gallery, or render it to HTML with --out.
    Gallery(GalleryArgs),
    /// Submit the form once.
    Generate(GenerateArgs),
    /// Interactive form.
    Session(SessionArgs),
}

#[derive(Debug, Args)]
struct StudioArgs {
    #[arg(long)]
    provider: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    allow_text_only: bool,
    #[arg(long)]
    gallery: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct GalleryArgs {
    #[arg(long)]
    gallery: Option<PathBuf>,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long, value_parser = parse_choice)]
    preset: Option<PromptChoice>,
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, conflicts_with = "image_url")]
    image: Option<PathBuf>,
    #[arg(long)]
    image_url: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    seed: Option<i64>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    studio: StudioArgs,
}

#[derive(Debug, Parser)]
struct SessionArgs {
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    studio: StudioArgs,
}

fn parse_choice(raw: &str) -> Result<PromptChoice, String> {
    PromptChoice::parse(raw).ok_or_else(|| {
        format!(
            "expected 0 (own prompt) or a preset number 1-{}",
            PRESET_PROMPTS.len()
        )
    })
}

fn main() {
    init_tracing();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("backdrop error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(filter))
        .try_init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Presets => {
            for line in preset_lines() {
                println!("{line}");
            }
            Ok(0)
        }
        Command::Gallery(args) => run_gallery(args),
        Command::Generate(args) => run_generate(args),
        Command::Session(args) => {
            run_session(args)?;
            Ok(0)
        }
    }
}

fn preset_lines() -> Vec<String> {
    let mut lines = vec![format!("0. {OWN_PROMPT_LABEL}")];
    for (index, text) in PRESET_PROMPTS.iter().enumerate() {
        lines.push(format!("{}. {text}", index + 1));
    }
    lines
}

fn studio_config(args: &StudioArgs) -> Result<StudioConfig> {
    let mut config = StudioConfig::from_env()?;
    if let Some(provider) = args.provider.as_deref().map(str::trim) {
        if !provider.is_empty() {
            config.provider = provider.to_ascii_lowercase();
        }
    }
    if let Some(model) = args.model.as_deref().map(str::trim) {
        if !model.is_empty() {
            config.model = model.to_string();
        }
    }
    if args.allow_text_only {
        config.imageless = ImagelessPolicy::TextOnly;
    }
    if let Some(path) = &args.gallery {
        config.gallery_path = Some(path.clone());
    }
    Ok(config)
}

fn open_studio(args: &StudioArgs) -> Result<Studio> {
    let config = studio_config(args)?;
    let events = args
        .events
        .as_ref()
        .map(|path| EventWriter::new(path, format!("session-{}", Uuid::new_v4())));
    Studio::new(config, events).context("could not start the studio")
}

fn run_gallery(args: GalleryArgs) -> Result<i32> {
    let gallery_path = match args.gallery {
        Some(path) => Some(path),
        None => StudioConfig::from_env()?.gallery_path,
    };
    let gallery = Gallery::load(gallery_path.as_deref())?;
    if gallery.is_empty() {
        tracing::warn!("gallery has no entries");
        println!("No examples.");
        return Ok(0);
    }
    if let Some(out) = &args.out {
        write_html(out, &render_gallery(&gallery))?;
        println!("Gallery written to {}", out.display());
        return Ok(0);
    }
    for (index, entry) in gallery.entries().iter().enumerate() {
        println!("{}. {}", index + 1, entry.title);
        if let Some(prompt) = entry.prompt.as_deref() {
            println!("   prompt: {prompt}");
        }
        println!("   input:  {}", entry.input_image);
        println!("   result: {}", entry.result_url);
    }
    Ok(0)
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let studio = open_studio(&args.studio)?;
    let mut form = SubmissionForm {
        choice: args.preset.unwrap_or_default(),
        custom_prompt: args.prompt.unwrap_or_default(),
        image_url: args.image_url,
        seed: args.seed,
        ..SubmissionForm::default()
    };
    if let Some(path) = &args.image {
        match UploadedImage::from_path(path) {
            Ok(upload) => form.upload = Some(upload),
            Err(err) => {
                println!("Error: {err}");
                return Ok(1);
            }
        }
    }

    tracing::info!(choice = %form.choice, image = form.has_image(), "submitting form");
    let submission = studio.submit(&form);
    report(&studio, &submission, args.out.as_deref())?;
    Ok(exit_code(&submission))
}

fn exit_code(submission: &Submission) -> i32 {
    match submission.outcome {
        SubmissionOutcome::ResultReady { .. } | SubmissionOutcome::NoImageInfo { .. } => 0,
        SubmissionOutcome::PromptMissing => 2,
        SubmissionOutcome::RequestFailed { .. } => 1,
    }
}

fn report(studio: &Studio, submission: &Submission, out: Option<&Path>) -> Result<()> {
    for line in terminal_lines(submission) {
        println!("{line}");
    }
    if let Some(out) = out {
        let presentation = Presentation::from_submission(submission);
        write_html(out, &render_page(&presentation, studio.gallery()))?;
        println!("Page written to {}", out.display());
    }
    Ok(())
}

fn write_html(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("failed writing {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = html.len(), "html written");
    Ok(())
}

fn run_session(args: SessionArgs) -> Result<()> {
    let studio = open_studio(&args.studio)?;
    let mut form = SubmissionForm::default();

    let stdin = io::stdin();
    let mut line = String::new();
    println!("Backdrop session started. Type /help for commands.");
    tracing::info!(provider = studio.provider_name(), "session started");

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        match apply_command(&studio, &mut form, parse_command(input), args.out.as_deref()) {
            Ok(SessionFlow::Continue) => {}
            Ok(SessionFlow::Quit) => break,
            Err(err) => println!("Error: {err:#}"),
        }
    }
    tracing::info!("session ended");
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum SessionFlow {
    Continue,
    Quit,
}

fn apply_command(
    studio: &Studio,
    form: &mut SubmissionForm,
    command: SessionCommand,
    out: Option<&Path>,
) -> Result<SessionFlow> {
    match command {
        SessionCommand::Noop => {}
        SessionCommand::Help => println!("Commands: {}", SESSION_HELP_COMMANDS.join(" ")),
        SessionCommand::Quit => return Ok(SessionFlow::Quit),
        SessionCommand::Status => {
            for line in status_lines(studio, form) {
                println!("{line}");
            }
        }
        SessionCommand::ListPresets => {
            for line in preset_lines() {
                println!("{line}");
            }
        }
        SessionCommand::ChoosePreset(choice) => {
            form.choice = choice;
            println!("Prompt choice: {}", choice.label());
        }
        SessionCommand::SetPrompt(text) => {
            form.custom_prompt = text;
            if form.choice != PromptChoice::Own {
                println!("Custom prompt saved; a preset is selected and takes precedence.");
            } else {
                println!("Custom prompt saved.");
            }
        }
        SessionCommand::AttachImage(path) => match UploadedImage::from_path(Path::new(&path)) {
            Ok(upload) => {
                println!("Attached {}", upload.file_name());
                form.clear_image();
                form.upload = Some(upload);
            }
            Err(err) => println!("Error: {err}"),
        },
        SessionCommand::AttachImageUrl(url) => {
            form.clear_image();
            println!("Image URL set to {url}");
            form.image_url = Some(url);
        }
        SessionCommand::ClearImage => {
            form.clear_image();
            println!("Image cleared.");
        }
        SessionCommand::SetSeed(seed) => {
            form.seed = Some(seed);
            println!("Seed set to {seed}");
        }
        SessionCommand::Generate => {
            let submission = studio.submit(form);
            report(studio, &submission, out)?;
        }
        SessionCommand::Gallery(path) => match path {
            Some(path) => {
                let path = PathBuf::from(path);
                write_html(&path, &render_gallery(studio.gallery()))?;
                println!("Gallery written to {}", path.display());
            }
            None => {
                for (index, entry) in studio.gallery().entries().iter().enumerate() {
                    println!("{}. {} -> {}", index + 1, entry.title, entry.result_url);
                }
            }
        },
        SessionCommand::Invalid { message, .. } => println!("{message}"),
        SessionCommand::Unknown { command, .. } => {
            tracing::debug!(command = %command, "unknown session command");
            println!("Unknown command: /{command}. Type /help for commands.")
        }
    }
    Ok(SessionFlow::Continue)
}

fn status_lines(studio: &Studio, form: &SubmissionForm) -> Vec<String> {
    let image = match (&form.upload, form.image_url.as_deref()) {
        (Some(upload), _) => upload.file_name().to_string(),
        (None, Some(url)) if !url.trim().is_empty() => url.to_string(),
        _ => "none".to_string(),
    };
    let seed = form.seed.unwrap_or_else(|| studio.config().default_seed());
    vec![
        format!("Provider: {}", studio.provider_name()),
        format!("Prompt choice: {}", form.choice.label()),
        format!(
            "Custom prompt: {}",
            if form.custom_prompt.is_empty() {
                "(empty)"
            } else {
                form.custom_prompt.as_str()
            }
        ),
        format!("Image: {image}"),
        format!("Seed: {seed}"),
    ]
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use backdrop_contracts::gallery::Gallery;
    use backdrop_contracts::prompts::PromptChoice;
    use backdrop_contracts::session::{parse_command, SessionCommand};
    use backdrop_engine::{DryrunProvider, Studio, StudioConfig, SubmissionForm};
    use clap::Parser;

    use super::{
        apply_command, exit_code, preset_lines, run_gallery, status_lines, studio_config, Cli,
        Command, GalleryArgs, SessionFlow,
    };

    fn dryrun_studio() -> Studio {
        Studio::with_provider(
            StudioConfig::default(),
            Box::new(DryrunProvider),
            Gallery::default(),
            None,
        )
    }

    #[test]
    fn generate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "backdrop",
            "generate",
            "--preset",
            "2",
            "--image",
            "bottle.png",
            "--seed",
            "-3",
            "--provider",
            "dryrun",
            "--allow-text-only",
        ])
        .unwrap();
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.preset, Some(PromptChoice::Preset(1)));
        assert_eq!(args.image, Some(PathBuf::from("bottle.png")));
        assert_eq!(args.seed, Some(-3));
        assert_eq!(args.studio.provider.as_deref(), Some("dryrun"));
        assert!(args.studio.allow_text_only);
    }

    #[test]
    fn image_and_image_url_are_exclusive() {
        let result = Cli::try_parse_from([
            "backdrop",
            "generate",
            "--image",
            "a.png",
            "--image-url",
            "https://example.test/a.png",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_preset_number_is_rejected() {
        assert!(Cli::try_parse_from(["backdrop", "generate", "--preset", "9"]).is_err());
    }

    #[test]
    fn flags_override_environment_config() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from([
            "backdrop",
            "session",
            "--provider",
            "DRYRUN",
            "--model",
            "black-forest-labs/flux-schnell",
            "--allow-text-only",
        ])?;
        let Command::Session(args) = cli.command else {
            panic!("expected session");
        };
        let config = studio_config(&args.studio)?;
        assert_eq!(config.provider, "dryrun");
        assert_eq!(config.model, "black-forest-labs/flux-schnell");
        assert_eq!(config.imageless, backdrop_engine::ImagelessPolicy::TextOnly);
        Ok(())
    }

    #[test]
    fn empty_gallery_writes_no_page() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let gallery = temp.path().join("gallery.json");
        std::fs::write(&gallery, r#"{"entries":[]}"#)?;
        let out = temp.path().join("gallery.html");
        let code = run_gallery(GalleryArgs {
            gallery: Some(gallery),
            out: Some(out.clone()),
        })?;
        assert_eq!(code, 0);
        assert!(!out.exists());
        Ok(())
    }

    #[test]
    fn preset_listing_starts_with_own_prompt() {
        let lines = preset_lines();
        assert_eq!(lines[0], "0. Use my own prompt");
        assert!(lines[2].starts_with("2. Elegant studio backdrop"));
    }

    #[test]
    fn session_commands_edit_the_form() -> anyhow::Result<()> {
        let studio = dryrun_studio();
        let mut form = SubmissionForm::default();

        apply_command(&studio, &mut form, parse_command("/preset 1"), None)?;
        apply_command(&studio, &mut form, parse_command("warm wooden table"), None)?;
        apply_command(
            &studio,
            &mut form,
            parse_command("/image_url https://example.test/a.png"),
            None,
        )?;
        apply_command(&studio, &mut form, parse_command("/seed 11"), None)?;
        assert_eq!(form.choice, PromptChoice::Preset(0));
        assert_eq!(form.custom_prompt, "warm wooden table");
        assert_eq!(form.image_url.as_deref(), Some("https://example.test/a.png"));
        assert_eq!(form.seed, Some(11));

        let status = status_lines(&studio, &form);
        assert_eq!(status[0], "Provider: dryrun");
        assert_eq!(status[3], "Image: https://example.test/a.png");
        assert_eq!(status[4], "Seed: 11");

        apply_command(&studio, &mut form, parse_command("/clear_image"), None)?;
        assert!(!form.has_image());
        assert_eq!(
            apply_command(&studio, &mut form, parse_command("/quit"), None)?,
            SessionFlow::Quit
        );
        Ok(())
    }

    #[test]
    fn bad_image_path_keeps_the_session_alive() -> anyhow::Result<()> {
        let studio = dryrun_studio();
        let mut form = SubmissionForm::default();
        let flow = apply_command(
            &studio,
            &mut form,
            SessionCommand::AttachImage("/definitely/missing.png".to_string()),
            None,
        )?;
        assert_eq!(flow, SessionFlow::Continue);
        assert!(form.upload.is_none());
        Ok(())
    }

    #[test]
    fn session_generate_writes_the_page() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image_path = temp.path().join("bottle.png");
        std::fs::write(&image_path, [0x89, b'P', b'N', b'G', 0, 1])?;
        let out = temp.path().join("out").join("page.html");

        let studio = dryrun_studio();
        let mut form = SubmissionForm::default();
        apply_command(&studio, &mut form, parse_command("/preset 2"), None)?;
        apply_command(
            &studio,
            &mut form,
            SessionCommand::AttachImage(image_path.to_string_lossy().to_string()),
            None,
        )?;
        apply_command(&studio, &mut form, SessionCommand::Generate, Some(&out))?;

        let html = std::fs::read_to_string(&out)?;
        assert!(html.contains("Generated Background"));
        assert!(html.contains("data:image/jpeg;base64,"));

        let submission = studio.submit(&form);
        assert_eq!(exit_code(&submission), 0);
        assert_eq!(exit_code(&studio.submit(&SubmissionForm::default())), 2);
        Ok(())
    }
}

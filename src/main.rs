use std::path::PathBuf;

use anyhow::{bail, Context};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use health_assess::assessment::model::{AnswerValue, ClarificationQuestion, QuestionKind};
use health_assess::assessment::{
    ProfileEdit, ProfileSnapshot, ResultsReport, StageController, StageEvent,
};
use health_assess::config::AssessConfig;
use health_assess::generation::{client_from_config, Generator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let Some(profile_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: health-assess <profile.json>");
        eprintln!("  The file holds personalInfo, lifestyle and familyHistory sections.");
        std::process::exit(2);
    };

    let config = AssessConfig::from_env().context("invalid configuration")?;

    eprintln!("Health Assess v{}", env!("CARGO_PKG_VERSION"));
    if config.is_online() {
        eprintln!("   Model: {}", config.model);
    } else {
        eprintln!("   Offline: ANTHROPIC_API_KEY not set, using standard questions");
    }
    eprintln!("   Timeout: {}s\n", config.generation_timeout.as_secs());

    let client = client_from_config(&config)?;
    let controller = StageController::new(client, Generator::from_config(&config));

    // Log where each stage's content came from
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let StageEvent::GenerationSettled { kind, source } = event {
                tracing::debug!(kind = %kind, source = %source, "Content ready");
            }
        }
    });

    let raw = tokio::fs::read_to_string(&profile_path)
        .await
        .with_context(|| format!("failed to read {}", profile_path.display()))?;
    let profile: ProfileSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", profile_path.display()))?;

    for edit in profile.into_edits() {
        controller
            .edit(edit)
            .await
            .context("profile file has an invalid value")?;
    }

    // PersonalInfo → Lifestyle → FamilyHistory → Clarification
    for _ in 0..3 {
        let transition = controller.advance().await;
        if !transition.moved() {
            bail!(
                "cannot leave the {} stage: age, weight and height must all be positive",
                transition.stage()
            );
        }
    }

    eprintln!("Preparing follow-up questions...");
    controller.settled().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let questions = controller.snapshot().await.questions;
    for question in &questions {
        if let Some(value) = prompt_answer(question, &mut lines).await? {
            controller
                .edit(ProfileEdit::Answer {
                    id: question.id.clone(),
                    value,
                })
                .await?;
        }
    }

    let transition = controller.advance().await;
    if !transition.moved() {
        bail!("required questions are still unanswered");
    }

    eprintln!("\nAssessing...");
    if !controller.settled().await.is_terminal() {
        bail!("assessment did not complete");
    }

    let snapshot = controller.snapshot().await;
    let report = ResultsReport::from_snapshot(&snapshot).context("no assessment stored")?;
    println!("{}", report.to_markdown());

    Ok(())
}

/// Ask one question until a valid answer is given. Blank input skips an
/// optional question.
async fn prompt_answer(
    question: &ClarificationQuestion,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<Option<AnswerValue>> {
    loop {
        eprintln!("\n{}{}", question.question, if question.required { " *" } else { "" });
        eprintln!("   {}", input_hint(&question.kind));
        eprint!("> ");

        let Some(line) = lines.next_line().await? else {
            bail!("input closed before all questions were answered");
        };
        let line = line.trim();

        if line.is_empty() {
            if question.required {
                eprintln!("   This question is required.");
                continue;
            }
            return Ok(None);
        }

        match parse_answer(&question.kind, line) {
            Ok(value) if question.check_answer(&value).is_ok() => return Ok(Some(value)),
            Ok(_) => eprintln!("   That value is out of range."),
            Err(message) => eprintln!("   {message}"),
        }
    }
}

fn input_hint(kind: &QuestionKind) -> String {
    match kind {
        QuestionKind::Select { options } => options
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{}) {o}", i + 1))
            .collect::<Vec<_>>()
            .join("  "),
        QuestionKind::Boolean => "yes / no".to_string(),
        QuestionKind::Slider { min, max, unit } => format!("{min} to {max} {unit}"),
        QuestionKind::Text => "free text".to_string(),
    }
}

/// Interpret typed input for a question type.
fn parse_answer(kind: &QuestionKind, input: &str) -> Result<AnswerValue, String> {
    match kind {
        QuestionKind::Boolean => match input.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" => Ok(AnswerValue::Bool(true)),
            "n" | "no" | "false" => Ok(AnswerValue::Bool(false)),
            _ => Err("Please answer yes or no.".to_string()),
        },
        QuestionKind::Slider { .. } => input
            .parse::<f64>()
            .map(AnswerValue::Number)
            .map_err(|_| "Please enter a number.".to_string()),
        QuestionKind::Select { options } => {
            if let Ok(n) = input.parse::<usize>()
                && let Some(option) = n.checked_sub(1).and_then(|i| options.get(i))
            {
                return Ok(AnswerValue::Text(option.clone()));
            }
            options
                .iter()
                .find(|o| o.eq_ignore_ascii_case(input))
                .map(|o| AnswerValue::Text(o.clone()))
                .ok_or_else(|| "Please pick one of the listed options.".to_string())
        }
        QuestionKind::Text => Ok(AnswerValue::Text(input.to_string())),
    }
}

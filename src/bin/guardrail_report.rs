use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use guardrail_align::config::RuleLoadPolicy;
use guardrail_align::pipeline::defaults::LexiconPhonemizer;
use guardrail_align::{
    summarize, EngineBuilder, EngineConfig, GrammarAnalysis, GrammarInput, GuardrailEngine,
    PhonemeAnalysis, PhonemeInput, WeaknessSummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RuleLoadChoice {
    FailFast,
    SkipInvalid,
}

impl RuleLoadChoice {
    fn policy(self) -> RuleLoadPolicy {
        match self {
            Self::FailFast => RuleLoadPolicy::FailFast,
            Self::SkipInvalid => RuleLoadPolicy::SkipInvalid,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "guardrail_report")]
#[command(about = "Run guardrail analyses over a cases file and write a JSON report")]
struct Args {
    #[arg(
        long,
        env = "GUARDRAIL_REPORT_CASES_FILE",
        default_value = "test-data/cases/report_cases.json"
    )]
    cases_file: PathBuf,
    #[arg(long, env = "GUARDRAIL_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "GUARDRAIL_REPORT_PHONEME_RULES")]
    phoneme_rules: Option<PathBuf>,
    #[arg(long, env = "GUARDRAIL_REPORT_GRAMMAR_RULES")]
    grammar_rules: Option<PathBuf>,
    #[arg(long, env = "GUARDRAIL_REPORT_NO_BUILTIN_RULES", default_value_t = false)]
    no_builtin_rules: bool,
    #[arg(long, env = "GUARDRAIL_REPORT_WEAKNESS_TABLE")]
    weakness_table: Option<PathBuf>,
    #[arg(long, env = "GUARDRAIL_REPORT_VOCAB")]
    vocab: Option<PathBuf>,
    #[arg(long, env = "GUARDRAIL_REPORT_BLANK_ID")]
    blank_id: Option<usize>,
    #[arg(long, env = "GUARDRAIL_REPORT_LEXICON")]
    lexicon: Option<PathBuf>,
    #[arg(
        long,
        env = "GUARDRAIL_REPORT_RULE_LOAD",
        value_enum,
        default_value_t = RuleLoadChoice::FailFast
    )]
    rule_load: RuleLoadChoice,
    #[arg(long, env = "GUARDRAIL_REPORT_LIMIT")]
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CasesFile {
    #[serde(default)]
    phoneme: Vec<PhonemeCase>,
    #[serde(default)]
    grammar: Vec<GrammarCase>,
}

#[derive(Debug, Deserialize)]
struct PhonemeCase {
    id: String,
    #[serde(flatten)]
    input: PhonemeInput,
}

#[derive(Debug, Deserialize)]
struct GrammarCase {
    id: String,
    #[serde(flatten)]
    input: GrammarInput,
}

#[derive(Debug, Serialize)]
struct Meta {
    schema_version: u32,
    generated_at: String,
    cases_file: String,
    phoneme_case_count: usize,
    grammar_case_count: usize,
    failed_case_count: usize,
}

#[derive(Debug, Serialize)]
struct PhonemeCaseReport {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<PhonemeAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct GrammarCaseReport {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<GrammarAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    meta: Meta,
    phoneme: Vec<PhonemeCaseReport>,
    grammar: Vec<GrammarCaseReport>,
    summary: WeaknessSummary,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    let repo_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    let cases_path = resolve_path(&repo_root, &args.cases_file);
    let out_path = resolve_out_path(&repo_root, args.out.as_ref());
    let mut cases = load_cases(&cases_path)?;
    if let Some(limit) = args.limit {
        cases.phoneme.truncate(limit);
        cases.grammar.truncate(limit);
    }
    let total = cases.phoneme.len() + cases.grammar.len();
    if total == 0 {
        return Err(format!(
            "No cases selected from '{}' after applying limit.",
            cases_path.display()
        ));
    }

    let engine = build_engine(&args, &repo_root)?;

    let progress = ProgressBar::new(total as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let mut failed = 0usize;
    let mut phoneme_reports = Vec::with_capacity(cases.phoneme.len());
    for case in &cases.phoneme {
        progress.set_message(case.id.clone());
        let report = match engine.analyze_phonemes(&case.input) {
            Ok(analysis) => PhonemeCaseReport {
                id: case.id.clone(),
                analysis: Some(analysis),
                error: None,
            },
            Err(err) => {
                tracing::warn!(case = %case.id, error = %err, "phoneme case failed");
                failed += 1;
                PhonemeCaseReport {
                    id: case.id.clone(),
                    analysis: None,
                    error: Some(err.to_string()),
                }
            }
        };
        phoneme_reports.push(report);
        progress.inc(1);
    }

    let mut grammar_reports = Vec::with_capacity(cases.grammar.len());
    for case in &cases.grammar {
        progress.set_message(case.id.clone());
        let report = match engine.correct_text(&case.input) {
            Ok(analysis) => GrammarCaseReport {
                id: case.id.clone(),
                analysis: Some(analysis),
                error: None,
            },
            Err(err) => {
                tracing::warn!(case = %case.id, error = %err, "grammar case failed");
                failed += 1;
                GrammarCaseReport {
                    id: case.id.clone(),
                    analysis: None,
                    error: Some(err.to_string()),
                }
            }
        };
        grammar_reports.push(report);
        progress.inc(1);
    }
    progress.finish_with_message("done");

    let phoneme_analyses: Vec<PhonemeAnalysis> = phoneme_reports
        .iter()
        .filter_map(|r| r.analysis.clone())
        .collect();
    let grammar_analyses: Vec<GrammarAnalysis> = grammar_reports
        .iter()
        .filter_map(|r| r.analysis.clone())
        .collect();
    let summary = summarize(&phoneme_analyses, &grammar_analyses);

    let report = Report {
        meta: Meta {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now().to_rfc3339(),
            cases_file: cases_path.display().to_string(),
            phoneme_case_count: phoneme_reports.len(),
            grammar_case_count: grammar_reports.len(),
            failed_case_count: failed,
        },
        phoneme: phoneme_reports,
        grammar: grammar_reports,
        summary,
    };
    write_report(&out_path, &report)?;
    tracing::info!(
        path = %out_path.display(),
        cases = total,
        failed,
        "report written"
    );
    Ok(())
}

fn build_engine(args: &Args, repo_root: &Path) -> Result<GuardrailEngine, String> {
    let path_string = |path: &Option<PathBuf>| {
        path.as_ref()
            .map(|p| resolve_path(repo_root, p).to_string_lossy().into_owned())
    };
    let config = EngineConfig {
        phoneme_rules_path: path_string(&args.phoneme_rules),
        grammar_rules_path: path_string(&args.grammar_rules),
        use_builtin_grammar_rules: !args.no_builtin_rules,
        weakness_table_path: path_string(&args.weakness_table),
        phoneme_vocab_path: path_string(&args.vocab),
        blank_id: args.blank_id,
        rule_load_policy: args.rule_load.policy(),
    };

    let mut builder = EngineBuilder::new(config);
    if let Some(lexicon) = args.lexicon.as_ref() {
        let lexicon_path = resolve_path(repo_root, lexicon);
        let phonemizer = LexiconPhonemizer::load(&lexicon_path).map_err(|err| {
            format!(
                "Failed to load pronunciation lexicon '{}': {err}",
                lexicon_path.display()
            )
        })?;
        builder = builder.with_phonemizer(Box::new(phonemizer));
    }
    builder
        .build()
        .map_err(|err| format!("Failed to build guardrail engine: {err}"))
}

fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| {
            format!("Failed to create report directory '{}': {err}", parent.display())
        })?;
    }
    let file = File::create(path)
        .map_err(|err| format!("Failed to create report '{}': {err}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)
        .map_err(|err| format!("Failed to serialize report '{}': {err}", path.display()))?;
    writeln!(writer)
        .and_then(|()| writer.flush())
        .map_err(|err| format!("Failed to finish report '{}': {err}", path.display()))
}

fn load_cases(path: &Path) -> Result<CasesFile, String> {
    require_path_exists(path, "Missing cases file.")?;
    let file = File::open(path)
        .map_err(|err| format!("Failed to open cases file '{}': {err}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| format!("Failed to parse cases file '{}': {err}", path.display()))
}

fn resolve_out_path(repo_root: &Path, out: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = out {
        return resolve_path(repo_root, path);
    }

    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    repo_root
        .join("target")
        .join("guardrail_reports")
        .join(format!("guardrail-report-{run_id}.json"))
}

fn resolve_path(repo_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo_root.join(path)
    }
}

fn require_path_exists(path: &Path, message: &str) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    Err(format!("{message} Missing path: {}", path.display()))
}

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facerank::config::{self, Config};
use facerank::ranker::{self, RankSummary, ReferenceSet};
use facerank::storage::{ReferenceRecord, ReferenceStore};
use facerank::{annotate, detections, AggregationMethod, ComparisonRecord, DetectionFile};
use log::{info, warn};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "facerank")]
#[command(
    version,
    about = "Rank faces by similarity to enrolled reference faces"
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a reference face from a detection file
    Enroll {
        #[arg(short, long)]
        subject: String,
        /// Detection JSON produced by the face detector
        #[arg(short, long)]
        detections: PathBuf,
        /// Which face in the file to enroll
        #[arg(short, long, default_value_t = 0)]
        face: usize,
        /// Free-form label for the reference (defaults to the image source)
        #[arg(short, long)]
        label: Option<String>,
        /// Run the sunglasses and quality heuristics on the attached image
        #[arg(long)]
        annotate: bool,
    },
    /// List enrolled references (all subjects when none is given)
    List {
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// Remove one enrolled reference
    Remove {
        #[arg(short, long)]
        subject: String,
        #[arg(long)]
        id: String,
    },
    /// Remove all enrolled references for a subject
    Purge {
        #[arg(short, long)]
        subject: String,
    },
    /// Rank the faces in detection files against a subject's references
    Rank {
        #[arg(short, long)]
        subject: String,
        /// best, average or median (anything else means average)
        #[arg(short, long)]
        method: Option<String>,
        /// Use only the first enrolled reference
        #[arg(long)]
        single: bool,
        /// Only print faces judged to be a match
        #[arg(long)]
        matches_only: bool,
        #[arg(long)]
        top: Option<usize>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
        /// Run the sunglasses and quality heuristics on attached images
        #[arg(long)]
        annotate: bool,
        /// Detection JSON files, one per comparison image
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Score a raw descriptor distance
    Score {
        distance: f64,
        #[arg(long)]
        sunglasses: bool,
    },
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    let cfg = config::load_config(config_path)?;
    let store = ReferenceStore::new(cfg.store_dir());

    match cli.command {
        Commands::Enroll {
            subject,
            detections,
            face,
            label,
            annotate,
        } => enroll(&cfg, &store, &subject, &detections, face, label, annotate),
        Commands::List { subject } => list(&store, subject.as_deref()),
        Commands::Remove { subject, id } => remove(&store, &subject, &id),
        Commands::Purge { subject } => purge(&store, &subject),
        Commands::Rank {
            subject,
            method,
            single,
            matches_only,
            top,
            json,
            annotate,
            files,
        } => {
            let method = method
                .as_deref()
                .map(AggregationMethod::parse_lenient)
                .unwrap_or(cfg.scoring.default_method);
            let opts = RankOptions {
                method,
                single,
                matches_only,
                top,
                json,
                annotate,
            };
            rank(&cfg, &store, &subject, &files, &opts)
        }
        Commands::Score {
            distance,
            sunglasses,
        } => {
            let r = facerank::compute_similarity(distance, sunglasses, &cfg.scoring);
            println!(
                "distance {:.4}: {:.1}% {} ({})",
                distance,
                r.similarity,
                r.confidence,
                if r.is_match { "match" } else { "no match" }
            );
            Ok(())
        }
        Commands::Config => open_config(config_path),
    }
}

fn read_detections(cfg: &Config, path: &Path, annotate: bool) -> Result<DetectionFile> {
    let file = detections::load_detection_file(path)?;
    if annotate {
        annotate::annotate_file(file, path, &cfg.sunglasses)
    } else {
        Ok(file)
    }
}

fn enroll(
    cfg: &Config,
    store: &ReferenceStore,
    subject: &str,
    path: &Path,
    face_index: usize,
    label: Option<String>,
    annotate: bool,
) -> Result<()> {
    info!("Enrolling reference for subject: {}", subject);

    let file = read_detections(cfg, path, annotate)?;
    let face = file.faces.get(face_index).with_context(|| {
        format!(
            "{} has {} face(s), no face at index {}",
            path.display(),
            file.faces.len(),
            face_index
        )
    })?;

    if face.has_sunglasses {
        warn!("Reference face appears to wear sunglasses; match bands will be widened");
    }

    let record = ReferenceRecord::from_face(label.unwrap_or_else(|| file.source.clone()), face);
    let id = record.id.clone();
    store
        .save_record(subject, record)
        .context("Failed to save reference record")?;

    info!("✓ Reference {} enrolled for subject: {}", id, subject);
    Ok(())
}

fn list(store: &ReferenceStore, subject: Option<&str>) -> Result<()> {
    let subjects = match subject {
        Some(s) => vec![s.to_string()],
        None => store.list_subjects()?,
    };
    if subjects.is_empty() {
        info!("No subjects enrolled in {}", store.root().display());
    }
    for subject in subjects {
        let records = store.load_records(&subject)?;
        println!("{} ({} reference(s))", subject, records.len());
        for r in records {
            println!(
                "  {}  {}  dims={}{}{}",
                r.id,
                r.label,
                r.descriptor.len(),
                if r.has_sunglasses { "  sunglasses" } else { "" },
                r.age.map(|a| format!("  age~{:.0}", a)).unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn remove(store: &ReferenceStore, subject: &str, id: &str) -> Result<()> {
    if store.remove_record(subject, id)? {
        info!("✓ Removed reference {} from {}", id, subject);
        Ok(())
    } else {
        anyhow::bail!("No reference {} enrolled for subject: {}", id, subject)
    }
}

fn purge(store: &ReferenceStore, subject: &str) -> Result<()> {
    info!("Purging references for subject: {}", subject);

    store.purge(subject).context("Failed to purge reference records")?;

    info!("✓ All references purged for subject: {}", subject);
    Ok(())
}

struct RankOptions {
    method: AggregationMethod,
    single: bool,
    matches_only: bool,
    top: Option<usize>,
    json: bool,
    annotate: bool,
}

#[derive(Serialize)]
struct RankReport<'a> {
    summary: RankSummary,
    results: &'a [ComparisonRecord],
}

fn rank(
    cfg: &Config,
    store: &ReferenceStore,
    subject: &str,
    files: &[PathBuf],
    opts: &RankOptions,
) -> Result<()> {
    let records = store
        .load_records(subject)
        .context("Failed to load reference records")?;

    if records.is_empty() {
        anyhow::bail!(
            "No references enrolled for subject: {}. Run 'enroll' first.",
            subject
        );
    }

    let mut faces: Vec<_> = records.iter().map(ReferenceRecord::to_face).collect();
    let reference = if opts.single || faces.len() == 1 {
        faces.truncate(1);
        ReferenceSet::Single(faces.remove(0))
    } else {
        ReferenceSet::Multi {
            faces,
            method: opts.method,
        }
    };
    info!(
        "Ranking against {} reference(s) for {}",
        reference.len(),
        subject
    );

    let images = files
        .iter()
        .map(|p| read_detections(cfg, p, opts.annotate))
        .collect::<Result<Vec<_>>>()?;

    let mut ranked = ranker::rank_comparisons(&reference, &images, &cfg.scoring).with_context(|| {
        format!(
            "Failed to rank against {}; comparison faces must come from the recognizer used at enrollment",
            subject
        )
    })?;
    let summary = RankSummary::from_records(&ranked);
    if opts.matches_only {
        ranked = ranker::filter_matches(ranked);
    }
    if let Some(n) = opts.top {
        ranked = ranker::top_n(ranked, n);
    }

    if opts.json {
        let report = RankReport {
            summary,
            results: &ranked,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (rank, r) in ranked.iter().enumerate() {
        println!(
            "{:>3}. {:>5.1}%  {:<9}  {}  {}#{}{}",
            rank + 1,
            r.similarity(),
            r.result.confidence().label(),
            if r.result.is_match() { "match   " } else { "no match" },
            r.filename,
            r.face_index,
            if r.has_sunglasses { "  (sunglasses)" } else { "" }
        );
    }
    info!(
        "{} of {} face(s) matched",
        summary.matches, summary.total_faces
    );
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(config::CONFIG_PATH.as_path());
    if !config_path.exists() {
        config::save_config(&Config::default(), Some(config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}

use cxr_coach::config::analyze::{self, AnalyzeConfig};
use cxr_coach::image::io::{save_grayscale_u8, save_mask_png, write_json_file};
use cxr_coach::pipeline::AnalysisReport;
use cxr_coach::RadiologyFeatureExtractor;
use std::env;
use std::fs;
use std::path::Path;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args()
        .nth(1)
        .ok_or_else(|| "Usage: analyze_xray <config.json>".to_string())?;
    let config = analyze::load_config(Path::new(&config_path))?;

    let bytes = fs::read(&config.input)
        .map_err(|e| format!("Failed to open {}: {e}", config.input.display()))?;
    let analyzer = config.build_analyzer()?;
    let report = analyzer
        .analyze(&bytes)
        .map_err(|e| format!("Failed to analyze {}: {e}", config.input.display()))?;

    print_text_summary(&report);

    if let Some(path) = &config.output.report_json {
        write_json_file(path, &report)?;
        println!("\nJSON report written to {}", path.display());
    }
    if let Some(dir) = &config.output.debug_dir {
        save_debug_artifacts(dir, &bytes, &config)?;
        println!("Debug artifacts written to {}", dir.display());
    }
    Ok(())
}

fn print_text_summary(report: &AnalysisReport) {
    let result = &report.result;
    println!("Diagnosis: {}", result.diagnosis);
    println!(
        "Confidence: {:.4} (raw classifier score {:.4})",
        result.confidence, result.raw_dl_score
    );
    println!("Summary: {}", result.summary);
    if report.classifier_degraded {
        println!("Classifier: degraded, zero scores substituted");
    }
    if !result.adjustments.is_empty() {
        println!("Adjustments:");
        for adj in &result.adjustments {
            println!("  - {adj}");
        }
    }
    if !result.flags.is_empty() {
        println!("Flags:");
        for flag in &result.flags {
            println!("  ! {flag}");
        }
    }
    if !report.similar_cases.is_empty() {
        println!("Similar cases:");
        for case in &report.similar_cases {
            println!(
                "  {} {} (similarity {:.3})",
                case.id, case.label, case.similarity
            );
        }
    }
    println!("Timings (ms): total {:.1}", report.timings.total_ms);
    for stage in &report.timings.stages {
        println!("  {:<24} {:>8.2}", stage.label, stage.elapsed_ms);
    }
}

fn save_debug_artifacts(dir: &Path, bytes: &[u8], config: &AnalyzeConfig) -> Result<(), String> {
    let extractor = RadiologyFeatureExtractor::new(config.extractor.clone());
    let detailed = extractor
        .extract_detailed(bytes)
        .map_err(|e| format!("Failed to decode {}: {e}", config.input.display()))?;
    save_grayscale_u8(&detailed.preprocessed, &dir.join("preprocessed.png"))?;
    save_mask_png(&detailed.lung_mask, &dir.join("lung_mask.png"))?;
    save_grayscale_u8(&detailed.zones.label_image(), &dir.join("zones.png"))?;
    Ok(())
}

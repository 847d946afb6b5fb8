use cxr_coach::features::RadiologyFeatureExtractor;
use cxr_coach::image::io::{save_grayscale_u8, save_mask_png, write_json_file};
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let (input, out_dir) = match (args.next(), args.next()) {
        (Some(input), Some(out)) => (PathBuf::from(input), PathBuf::from(out)),
        _ => return Err("Usage: segment_xray <input> <out_dir>".to_string()),
    };

    let bytes =
        fs::read(&input).map_err(|e| format!("Failed to open {}: {e}", input.display()))?;
    let detailed = RadiologyFeatureExtractor::default()
        .extract_detailed(&bytes)
        .map_err(|e| format!("Failed to decode {}: {e}", input.display()))?;

    save_grayscale_u8(&detailed.preprocessed, &out_dir.join("preprocessed.png"))?;
    save_mask_png(&detailed.lung_mask, &out_dir.join("lung_mask.png"))?;
    save_grayscale_u8(&detailed.zones.label_image(), &out_dir.join("zones.png"))?;
    write_json_file(&out_dir.join("features.json"), &detailed.features)?;

    let seg = &detailed.diagnostics.segmentation;
    println!(
        "Segmented {}: otsu level {}, {} components, kept {}, lung ratio {:.4}",
        input.display(),
        seg.otsu_level,
        seg.component_count,
        seg.kept_regions.len(),
        seg.lung_area_ratio
    );
    println!("Outputs written to {}", out_dir.display());
    Ok(())
}

use cxr_coach::image::GrayImageU8;
use cxr_coach::{FusionEngine, LabelScores, RadiologyFeatureExtractor};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Demo: synthetic radiograph with two dark lung fields and a bright
    // opacity in the image-left (anatomical right) lower field.
    let (w, h) = (512usize, 512usize);
    let mut gray = vec![200u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let in_ellipse = |cx: f32, cy: f32| {
                let dx = (x as f32 - cx) / 60.0;
                let dy = (y as f32 - cy) / 120.0;
                dx * dx + dy * dy <= 1.0
            };
            if in_ellipse(162.0, 256.0) || in_ellipse(350.0, 256.0) {
                gray[y * w + x] = 50;
            }
            let (dx, dy) = (x as f32 - 162.0, y as f32 - 330.0);
            if dx * dx + dy * dy <= 20.0 * 20.0 {
                gray[y * w + x] = 150;
            }
        }
    }
    let image = GrayImageU8::new(w, h, gray);

    let extracted = RadiologyFeatureExtractor::default().extract_from_image(&image);
    let mut scores = LabelScores::new();
    scores.insert("Pneumonia", 0.82);
    scores.insert("Effusion", 0.11);

    let result = FusionEngine::default().fuse(&scores, &extracted.features, None);
    println!(
        "lung_ratio={:.3} diagnosis={} confidence={:.3} latency_ms={:.1}",
        extracted.features.get_or_zero("lung_area_ratio"),
        result.diagnosis,
        result.confidence,
        extracted.diagnostics.timings.total_ms
    );
    println!("{}", result.summary);
}

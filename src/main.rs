use std::{env, path::PathBuf};

use anyhow::Context;
use dataset::FsSource;
use digit_recognizer::{CapturedImage, RecognizerConfig, Session, StartOutcome};
use log::{info, warn};

/// Usage: `digit-recognizer [--config <file.json>] [image.png ...]`
///
/// Trains a model on the configured assets, prints its evaluation and classifies every
/// 28x28 image given.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1).peekable();
    let config_path = match args.peek().map(String::as_str) {
        Some("--config") => {
            args.next();
            Some(PathBuf::from(args.next().context("--config needs a path")?))
        }
        _ => None,
    };
    let images: Vec<PathBuf> = args.map(PathBuf::from).collect();

    let config = RecognizerConfig::load(config_path.as_deref())?;
    let source = FsSource::new(&config.assets_dir);
    let epochs = config.epochs.clone();
    let session = Session::new(config, source);

    if let StartOutcome::Trained(history) = session.start_training(epochs).await? {
        if let Some(last) = history.last() {
            info!("final {last}");
        }
    }

    if let Some(summary) = session.model_summary().await {
        for layer in summary {
            let shape = format!("{:?}", layer.output_shape);
            println!("{:<14} {shape:<14} {:>6}", layer.name, layer.params);
        }
    }

    let evaluation = session.evaluate().await?;
    println!("\naccuracy {:.4}\n{}", evaluation.accuracy, evaluation.confusion);
    for class in &evaluation.per_class {
        println!("class {}: {:.4} over {}", class.class, class.accuracy, class.count);
    }

    for path in images {
        let image = image::open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let captured = match CapturedImage::from_image(&image) {
            Ok(captured) => captured,
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                continue;
            }
        };

        if let Some(prediction) = session.predict(Some(&captured)) {
            println!("{}: {prediction}", path.display());
        }
    }

    Ok(())
}

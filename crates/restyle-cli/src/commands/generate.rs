//! Single-image generation command

use anyhow::Result;
use restyle_core::RestyleConfig;
use restyle_gen::{extension_for_mime, mime_for_path};
use std::path::{Path, PathBuf};

pub fn run(
    path: &str,
    prompt: Option<&str>,
    output: Option<&str>,
    provider: Option<&str>,
) -> Result<()> {
    let config = RestyleConfig::load()?;
    let source = PathBuf::from(path);
    anyhow::ensure!(source.is_file(), "Not a file: {}", source.display());

    let prompt = prompt.unwrap_or(&config.generation.prompt);
    anyhow::ensure!(
        !prompt.is_empty(),
        "No prompt given; pass --prompt or set generation.prompt in the config"
    );

    let client = super::build_client(&config, provider)?;
    let bytes = std::fs::read(&source)?;
    let mime = mime_for_path(&source);
    let images = client.generate_variations(&bytes, mime, prompt, &config.generation.size_class)?;

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let out_dir = match output {
        Some(dir) => PathBuf::from(dir),
        None => source
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{}_variations", stem)),
    };
    std::fs::create_dir_all(&out_dir)?;
    for (i, image) in images.iter().enumerate() {
        let dest = out_dir.join(format!("{:03}.{}", i + 1, extension_for_mime(&image.mime)));
        std::fs::write(&dest, &image.bytes)?;
        println!("Wrote {}", dest.display());
    }
    Ok(())
}

//! Check for the external tools used by export and motion analysis.

use glide_render_engine::media::command_exists;

pub fn run() -> anyhow::Result<()> {
    println!("Glide System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("ffmpeg", "decoding recordings and encoding video exports"),
        ("ffprobe", "reading recording size, duration, and frame rate"),
    ];

    let mut missing = 0;
    for (binary, purpose) in tools {
        if command_exists(binary) {
            println!("[OK]   {binary}: {purpose}");
        } else {
            println!("[MISS] {binary}: {purpose}");
            missing += 1;
        }
    }

    println!();
    if missing == 0 {
        println!("All tools are available. Glide is ready.");
    } else {
        println!("Some tools are missing. PNG-sequence export of generated sources still works.");
    }

    Ok(())
}

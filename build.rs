// Build script to compile GLSL shaders to SPIR-V

use std::path::Path;
use std::process::Command;

const SHADER_OUT_DIR: &str = "data/shaders/model";

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    if let Err(e) = std::fs::create_dir_all(SHADER_OUT_DIR) {
        eprintln!("Warning: cannot create {}: {}", SHADER_OUT_DIR, e);
        return;
    }

    // Compile shaders using glslc (part of Vulkan SDK)
    compile_shader("shaders/model.vert", "data/shaders/model/vert.spv");
    compile_shader("shaders/model.frag", "data/shaders/model/frag.spv");
}

fn compile_shader(input: &str, output: &str) {
    let input_path = Path::new(input);
    let output_path = Path::new(output);

    // Check if glslc is available
    let result = Command::new("glslc")
        .arg(input_path)
        .arg("-o")
        .arg(output_path)
        .status();

    match result {
        Ok(status) if status.success() => {
            println!("Compiled {} -> {}", input, output);
        }
        Ok(status) => {
            panic!("Failed to compile {}: exit code {:?}", input, status.code());
        }
        Err(e) => {
            println!("cargo:warning=glslc not found ({}); {} not rebuilt", e, output);
            eprintln!("Install Vulkan SDK or compile manually:");
            eprintln!("  glslc {} -o {}", input, output);
        }
    }
}

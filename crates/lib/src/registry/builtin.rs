use super::{ContainerSpec, TargetSpec};

const TRITON_SERVER_IMAGE: &str = "nvcr.io/nvidia/tritonserver:24.08-py3";

fn cmake_configure(spec: TargetSpec, source_dir: &str, extra: &[&str]) -> TargetSpec {
  let mut argv = vec![
    "cmake".to_string(),
    "-G".to_string(),
    "$${generator}".to_string(),
    "-DCMAKE_BUILD_TYPE=$${build_type}".to_string(),
  ];
  argv.extend(extra.iter().map(|s| s.to_string()));
  argv.push(format!("-S$${{source}}{source_dir}"));
  argv.push("-B$${build}".to_string());
  spec.configure(argv)
}

/// The targets known without a target file, in batch order.
pub fn builtin_targets() -> Vec<TargetSpec> {
  vec![
    cmake_configure(
      TargetSpec::new("llvm", "llvm-project")
        .repository("https://github.com/llvm/llvm-project.git")
        .shallow(1)
        .describe("LLVM with MLIR, host and NVPTX backends"),
      "/llvm",
      &[
        "-DLLVM_ENABLE_PROJECTS=mlir",
        "-DLLVM_TARGETS_TO_BUILD=host;NVPTX",
        "-DLLVM_ENABLE_ASSERTIONS=ON",
      ],
    )
    .build(["cmake", "--build", "$${build}"])
    .outputs(["bin/mlir-opt", "bin/llc"]),
    cmake_configure(
      TargetSpec::new("iree", "iree")
        .repository("https://github.com/iree-org/iree.git")
        .describe("IREE compiler and runtime")
        .configure([
          "git",
          "-C",
          "$${source}",
          "submodule",
          "update",
          "--init",
          "--depth",
          "1",
        ]),
      "",
      &["-DIREE_ENABLE_ASSERTIONS=ON", "-DIREE_BUILD_TESTS=OFF"],
    )
    .build(["cmake", "--build", "$${build}"])
    .outputs(["tools/iree-compile"]),
    TargetSpec::new("triton", "triton")
      .repository("https://github.com/triton-lang/triton.git")
      .describe("Triton compiler, installed in editable mode")
      .build([
        "python3",
        "-m",
        "pip",
        "install",
        "--no-build-isolation",
        "-e",
        "$${source}",
      ]),
    cmake_configure(
      TargetSpec::new("cutlass", "cutlass")
        .repository("https://github.com/NVIDIA/cutlass.git")
        .shallow(1)
        .describe("CUTLASS profiler"),
      "",
      &["-DCUTLASS_NVCC_ARCHS=80", "-DCUTLASS_ENABLE_TESTS=OFF"],
    )
    .build(["cmake", "--build", "$${build}", "--target", "cutlass_profiler"])
    .outputs(["tools/profiler/cutlass_profiler"]),
    TargetSpec::new("nccl", "nccl")
      .repository("https://github.com/NVIDIA/nccl.git")
      .shallow(1)
      .describe("NCCL collective communication library")
      .build(["make", "-C", "$${source}", "src.build", "BUILDDIR=$${build}"])
      .outputs(["lib/libnccl.so"]),
    TargetSpec::new("tritonserver", "tritonserver")
      .describe("Triton Inference Server container with a local model repository")
      .container(ContainerSpec {
        image: TRITON_SERVER_IMAGE.to_string(),
        ports: vec![(8000, 8000), (8001, 8001), (8002, 8002)],
        volumes: vec![("$${source}/models".to_string(), "/models".to_string())],
        run_args: vec!["--gpus=all".to_string()],
        args: vec!["tritonserver".to_string(), "--model-repository=/models".to_string()],
      }),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builtins_are_valid() {
    for spec in builtin_targets() {
      spec.validate().unwrap_or_else(|e| panic!("{}: {}", spec.id, e));
    }
  }

  #[test]
  fn cmake_targets_pass_generator_and_build_type() {
    let targets = builtin_targets();
    let llvm = targets.iter().find(|t| t.id == "llvm").unwrap();

    let configure = &llvm.configure[0];
    assert_eq!(configure[0], "cmake");
    assert!(configure.contains(&"$${generator}".to_string()));
    assert!(configure.contains(&"-DCMAKE_BUILD_TYPE=$${build_type}".to_string()));
    assert!(configure.contains(&"-S$${source}/llvm".to_string()));
  }

  #[test]
  fn container_target_has_nothing_to_clone() {
    let targets = builtin_targets();
    let server = targets.iter().find(|t| t.id == "tritonserver").unwrap();

    assert!(server.repository.is_none());
    assert!(server.container.is_some());
  }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Compiles the vigil wire schema into Rust gRPC stubs.
//!
//! Uses `tonic-build` with the vendored protoc binary so builds do not
//! depend on a system protobuf compiler. Generated code is placed in
//! `OUT_DIR` and included via `tonic::include_proto!` in `src/lib.rs`.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path().unwrap());

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/vigil.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/vigil.proto");

    Ok(())
}

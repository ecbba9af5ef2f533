// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! System-level integration tests
//!
//! Every program runs on both engines; results are checked against known
//! values and against each other.

mod common;

use common::assertions::*;
use common::fixtures::*;
use common::test_roms::*;
use r4300::core::config::{CpuConfig, EngineKind};
use r4300::core::cpu::{BreakEvent, Debugger};
use r4300::core::error::EmulatorError;
use r4300::core::jit::ExecutionEngine;
use r4300::core::memory::ByteOrder;
use r4300::core::snapshot::Snapshot;
use r4300::core::system::{StopReason, System};

const ENGINES: [EngineKind; 2] = [EngineKind::Interpreter, EngineKind::Recompiler];
const STEP_LIMIT: u64 = 10_000;

#[test]
fn test_system_initialization() {
    let system = create_system(EngineKind::Recompiler);
    assert_eq!(system.pc(), 0xFFFF_FFFF_BFC0_0000);
    assert_eq!(system.steps(), 0);
    assert_eq!(system.engine().kind(), EngineKind::Recompiler);
    assert!(system.cpu().mode64());
}

#[test]
fn test_invalid_config_rejected() {
    let config = CpuConfig {
        hot_registers: 40,
        ..CpuConfig::default()
    };
    assert!(matches!(
        System::new(config, MEMORY_SIZE),
        Err(EmulatorError::Config(_))
    ));
}

#[test]
fn test_sum_loop() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &test_program_sum());
        run_to(&mut system, test_program_sum_done(), STEP_LIMIT);
        assert_gpr(&system, 2, 55);
        assert_gpr(&system, 8, 0);
    }
}

#[test]
fn test_sum_loop_32bit_mode() {
    for engine in ENGINES {
        let config = CpuConfig {
            engine,
            mode64: false,
            ..CpuConfig::default()
        };
        let mut system = create_configured_system(config, &test_program_sum());
        run_to(&mut system, test_program_sum_done(), STEP_LIMIT);
        assert_gpr(&system, 2, 55);
        assert_pc(&system, test_program_sum_done() as u32);
    }
}

#[test]
fn test_copy_loop() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &test_program_copy());
        for i in 0..8u64 {
            system
                .memory_mut()
                .store(COPY_SOURCE + 4 * i, 4, 0x1111_1111 * (i + 1))
                .unwrap();
        }

        run_to(&mut system, test_program_copy_done(), STEP_LIMIT);
        for i in 0..8u64 {
            assert_memory_word(&mut system, COPY_DEST + 4 * i, 0x1111_1111 * (i as u32 + 1));
        }
        assert_gpr(&system, 6, 0);
        assert_gpr(&system, 5, 0xFFFF_FFFF_8000_3020);
    }
}

#[test]
fn test_syscall_handler_counts() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &test_program_syscall());
        install_handler(&mut system, &test_handler_count_and_skip());

        run_to(&mut system, test_program_syscall_done(), STEP_LIMIT);
        assert_gpr(&system, 16, 3);
        assert_gpr(&system, 8, 0);
        assert_eq!(system.cpu().cop0.exception_code(), 8);
    }
}

#[test]
fn test_call_and_likely_branch() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &test_program_call());
        run_to(&mut system, test_program_call_done(), STEP_LIMIT);

        assert_gpr(&system, 2, 12);
        assert_gpr(&system, 9, 0);
        assert_gpr(&system, 10, 2);
        assert_gpr(&system, 31, 0xFFFF_FFFF_8000_100C);
    }
}

#[test]
fn test_overflow_and_divide_by_zero() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &test_program_faults());
        install_handler(&mut system, &test_handler_count_and_skip());
        run_to(&mut system, test_program_faults_done(), STEP_LIMIT);

        // One overflow trap, destination untouched
        assert_gpr(&system, 16, 1);
        assert_gpr(&system, 10, 0);
        assert_gpr(&system, 11, 0xFFFF_FFFF_8000_0000);
        assert_gpr(&system, 12, u64::MAX);
        assert_gpr(&system, 13, 0x7FFF_FFFF);
    }
}

#[test]
fn test_engines_agree() {
    let programs: Vec<(Vec<u32>, u64)> = vec![
        (test_program_sum(), test_program_sum_done()),
        (test_program_syscall(), test_program_syscall_done()),
        (test_program_call(), test_program_call_done()),
        (test_program_faults(), test_program_faults_done()),
    ];

    for (program, done) in programs {
        let mut systems = ENGINES.map(|engine| {
            let mut system = create_system_with_program(engine, &program);
            install_handler(&mut system, &test_handler_count_and_skip());
            run_to(&mut system, done, STEP_LIMIT);
            system
        });
        let [interpreter, recompiler] = &mut systems;
        assert_same_registers(interpreter.cpu(), recompiler.cpu());
        assert!(recompiler.steps() < interpreter.steps());
    }
}

#[test]
fn test_snapshot_resumes_on_other_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sum.snap");

    let mut first = create_system_with_program(EngineKind::Interpreter, &test_program_sum());
    first.run(11).unwrap();
    first.snapshot().save(&path).unwrap();

    let snapshot = Snapshot::load(&path).unwrap();
    assert_eq!(snapshot.metadata.engine, "interpreter");

    let mut second = create_system_with_program(EngineKind::Recompiler, &test_program_sum());
    second.restore(&snapshot);
    assert_eq!(second.pc(), first.pc());

    run_to(&mut second, test_program_sum_done(), STEP_LIMIT);
    assert_gpr(&second, 2, 55);
}

#[test]
fn test_load_image_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sum.bin");
    let bytes: Vec<u8> = test_program_sum().iter().flat_map(|w| w.to_be_bytes()).collect();
    std::fs::write(&path, &bytes).unwrap();

    let mut system = create_system(EngineKind::Recompiler);
    assert_eq!(system.load_image(&path, PROGRAM_BASE).unwrap(), bytes.len());
    system.set_pc(PROGRAM_BASE);

    run_to(&mut system, test_program_sum_done(), STEP_LIMIT);
    assert_gpr(&system, 2, 55);
}

#[test]
fn test_missing_image_is_io_error() {
    let mut system = create_system(EngineKind::Interpreter);
    let err = system.load_image("/nonexistent/image.bin", PROGRAM_BASE).unwrap_err();
    assert!(matches!(err, EmulatorError::Io(_)));
}

#[test]
fn test_swapped_byte_order() {
    for engine in ENGINES {
        let config = CpuConfig {
            engine,
            byte_order: ByteOrder::Swapped16,
            ..CpuConfig::default()
        };
        let mut system = create_configured_system(config, &test_program_copy());
        for i in 0..8u64 {
            system.memory_mut().store(COPY_SOURCE + 4 * i, 4, i + 1).unwrap();
        }

        run_to(&mut system, test_program_copy_done(), STEP_LIMIT);
        assert_memory_word(&mut system, COPY_DEST + 28, 8);
    }
}

#[test]
fn test_trace_file_respects_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.log");
    let config = CpuConfig {
        engine: EngineKind::Interpreter,
        trace_path: Some(path.clone()),
        trace_limit: Some(5),
        ..CpuConfig::default()
    };
    let mut system = create_configured_system(config, &test_program_sum());
    system.run(20).unwrap();

    let trace = std::fs::read_to_string(&path).unwrap();
    assert_eq!(trace.lines().count(), 5);
    assert!(trace.lines().next().unwrap().contains("PC=0xFFFFFFFF80001000"));
}

#[test]
fn test_invalid_instruction_is_fatal() {
    for engine in ENGINES {
        let mut system = create_system_with_program(engine, &[0x2402_0005, 0xEC00_0000, 0]);
        let err = system.run(10).unwrap_err();
        assert!(
            matches!(
                err,
                EmulatorError::InvalidInstruction { .. } | EmulatorError::CompiledBlock { .. }
            ),
            "{} engine: {}",
            system.engine().kind(),
            err
        );

        let dump = system.fatal_dump();
        assert!(dump.contains("CPU Registers"));
        assert!(dump.contains(system.engine().name()));
    }
}

#[test]
fn test_entry_point_leaves_boot_mode() {
    for engine in ENGINES {
        let config = CpuConfig {
            engine,
            entry_point: Some(PROGRAM_BASE + 8),
            ..CpuConfig::default()
        };
        let mut system = create_configured_system(config, &test_program_sum());
        assert!(system.cpu().in_boot_mode());

        run_to(&mut system, test_program_sum_done(), STEP_LIMIT);
        assert!(!system.cpu().in_boot_mode());
        assert_gpr(&system, 2, 55);
    }
}

#[test]
fn test_run_stops_at_breakpoint() {
    let mut system = create_system_with_program(EngineKind::Recompiler, &test_program_sum());
    let mut debugger = Debugger::new();
    debugger.add_breakpoint(0xFFFF_FFFF_8000_1010);
    system.cpu_mut().attach_debugger(debugger);

    let summary = system.run(100).unwrap();
    assert_eq!(
        summary.stop,
        StopReason::Breakpoint(BreakEvent::Address(0xFFFF_FFFF_8000_1010))
    );
    assert_eq!(summary.instructions, 4);
    assert_gpr(&system, 2, 10);
}

#[test]
fn test_config_file_drives_system() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("r4300.toml");
    std::fs::write(
        &path,
        "engine = \"interpreter\"\nbyte_order = \"big\"\nhot_registers = 4\n",
    )
    .unwrap();

    let config = CpuConfig::load(&path).unwrap();
    assert_eq!(config.hot_registers, 4);
    let system = System::new(config, MEMORY_SIZE).unwrap();
    assert_eq!(system.engine().kind(), EngineKind::Interpreter);
}

#[test]
fn test_reset_returns_to_reset_vector() {
    let mut system = create_system_with_program(EngineKind::Recompiler, &test_program_sum());
    system.run(3).unwrap();
    assert!(system.steps() > 0);

    system.reset();
    assert_eq!(system.pc(), 0xFFFF_FFFF_BFC0_0000);
    assert_eq!(system.steps(), 0);
}

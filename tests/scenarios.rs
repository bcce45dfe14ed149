//! End-to-end scenarios: assemble a short program, run it to completion, and assert
//! on the final register file and memory deltas rather than cycle-by-cycle stdout
//! text, which is a formatting detail internal to `report`.

use mips5_sim::assembler;
use mips5_sim::cpu::Simulator;
use mips5_sim::error::SimulatorError;
use mips5_sim::pipeline::driver::{self, RunMode};

const T0: usize = 8;
const T1: usize = 9;
const T2: usize = 10;
const T3: usize = 11;

fn run_to_completion(source: &str) -> (Simulator, Vec<u8>) {
    let program = assembler::assemble(source).expect("source assembles");
    let mut cpu = Simulator::new(program);
    let mut out = Vec::new();
    driver::run(&mut cpu, RunMode::Baseline, 1_000, &mut out).expect("program runs to completion");
    (cpu, out)
}

fn run_and_fail(source: &str) -> SimulatorError {
    let program = assembler::assemble(source).expect("source assembles");
    let mut cpu = Simulator::new(program);
    let mut out = Vec::new();
    driver::run(&mut cpu, RunMode::Baseline, 1_000, &mut out).expect_err("program must fault")
}

#[test]
fn a_read_after_write_hazard_stalls_but_still_resolves() {
    let (cpu, _) = run_to_completion("addi $t0, $zero, 5\naddi $t1, $t0, 3\n");
    let regs = cpu.registers.snapshot();
    assert_eq!(regs[T1], 8);
}

#[test]
fn a_taken_branch_skips_the_fall_through_instruction() {
    let (cpu, _) = run_to_completion(
        "addi $t0, $zero, 1\n\
         addi $t1, $zero, 1\n\
         beq $t0, $t1, skip\n\
         addi $t2, $zero, 99\n\
         skip: addi $t3, $zero, 7\n",
    );
    let regs = cpu.registers.snapshot();
    assert_eq!(regs[T2], 0);
    assert_eq!(regs[T3], 7);
}

#[test]
fn a_store_then_load_round_trips_through_memory_and_reports_the_delta() {
    let (cpu, out) = run_to_completion(
        "addi $t0, $zero, 4000\n\
         sw $t0, 100($zero)\n\
         lw $t1, 100($zero)\n",
    );
    let regs = cpu.registers.snapshot();
    assert_eq!(regs[T1], 4000);

    let text = String::from_utf8(out).unwrap();
    assert!(
        text.lines().any(|line| line == "1 25 4000"),
        "expected a memory-delta line for word 25, got:\n{text}"
    );
}

#[test]
fn a_jump_to_an_undefined_label_is_fatal() {
    let err = run_and_fail("j nowhere\n");
    assert!(matches!(err, SimulatorError::Execution(_)));
    assert!(!err.offending_tokens().is_empty());
}

#[test]
fn a_misaligned_load_address_is_fatal() {
    let err = run_and_fail("lw $t0, 3($zero)\n");
    assert!(matches!(err, SimulatorError::Execution(_)));
}

#[test]
fn back_to_back_alu_dependencies_each_stall_and_still_compute_correctly() {
    let (cpu, _) = run_to_completion(
        "addi $t0, $zero, 10\n\
         addi $t0, $t0, -3\n\
         addi $t0, $t0, -3\n",
    );
    let regs = cpu.registers.snapshot();
    assert_eq!(regs[T0], 4);
}

#[test]
fn writing_zero_register_as_a_destination_is_fatal() {
    let err = run_and_fail("addi $zero, $zero, 1\n");
    assert!(matches!(err, SimulatorError::Execution(_)));
}

#[test]
fn a_program_that_never_drains_hits_the_cycle_limit() {
    let program = assembler::assemble("loop: j loop\n").expect("source assembles");
    let mut cpu = Simulator::new(program);
    let mut out = Vec::new();
    let err = driver::run(&mut cpu, RunMode::Baseline, 50, &mut out).expect_err("must hit cycle limit");
    assert!(matches!(err, SimulatorError::Execution(_)));
}

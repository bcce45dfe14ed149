//! Per-cycle and fatal-error output formatting, kept separate from the driver so the
//! wire format can be tested without running a whole simulation.

use std::io::{self, Write};

pub fn write_cycle_report(out: &mut impl Write, registers: &[i32], deltas: &[(u32, i32)]) -> io::Result<()> {
    let regs_line = registers
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{regs_line}")?;

    if deltas.is_empty() {
        writeln!(out, "0")?;
    } else {
        write!(out, "{} ", deltas.len())?;
        for (address, value) in deltas {
            writeln!(out, "{address} {value}")?;
        }
    }
    Ok(())
}

/// Writes a fatal-condition report: a blank line, the human-readable message, and
/// (when there is an offending instruction) its raw operand tokens.
pub fn write_fault(out: &mut impl Write, message: &str, tokens: &[String]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{message}")?;
    if !tokens.is_empty() {
        writeln!(out, "Error encountered at:")?;
        writeln!(out, "{}", tokens.join(" "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_with_no_memory_writes_reports_a_bare_zero() {
        let mut out = Vec::new();
        write_cycle_report(&mut out, &[0; 32], &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap().split(' ').count(), 32);
        assert_eq!(lines.next(), Some("0"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn single_delta_shares_the_count_line() {
        let mut out = Vec::new();
        write_cycle_report(&mut out, &[0; 32], &[(25, 4000)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let last_line = text.lines().last().unwrap();
        assert_eq!(last_line, "1 25 4000");
    }

    #[test]
    fn multiple_deltas_each_get_their_own_line() {
        let mut out = Vec::new();
        write_cycle_report(&mut out, &[0; 32], &[(1, 10), (2, 20)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        lines.next(); // register line
        assert_eq!(lines.next(), Some("2 1 10"));
        assert_eq!(lines.next(), Some("2 20"));
    }

    #[test]
    fn fault_report_includes_offending_tokens() {
        let mut out = Vec::new();
        write_fault(&mut out, "bad thing happened", &["sw".into(), "$t0".into()]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "\nbad thing happened\nError encountered at:\nsw $t0\n"
        );
    }
}

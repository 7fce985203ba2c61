use std::fmt;
use std::str::FromStr;

use super::process_control_block::Pid;

pub const DEFAULT_QUANTUM: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleKind {
    RoundRobin,
    FirstComeFirstServed,
    Priority,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ScheduleKind::RoundRobin => f.write_str("rr"),
            ScheduleKind::FirstComeFirstServed => f.write_str("fcfs"),
            ScheduleKind::Priority => f.write_str("priority"),
        }
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rr" | "round-robin" => Ok(ScheduleKind::RoundRobin),
            "fcfs" => Ok(ScheduleKind::FirstComeFirstServed),
            "priority" => Ok(ScheduleKind::Priority),
            other => Err(format!("Unknown schedule {}. Expected rr, fcfs or priority", other)),
        }
    }
}

/// Decides when the executing process has used up its turn.
///
/// Round robin counts consecutive ticks spent on the same pid and asks for a
/// switch once that count reaches the quantum. First-come-first-served never
/// switches. Priority never switches on its own; the ready queue is kept sorted
/// instead and preemption is decided by comparing priorities on admission.
pub struct SchedulePolicy {
    kind: ScheduleKind,
    quantum: usize,
    current_quantum: usize,
    last_pid: Option<Pid>,
}

impl SchedulePolicy {
    pub fn new(kind: ScheduleKind, quantum: usize) -> SchedulePolicy {
        SchedulePolicy {
            kind,
            quantum: quantum.max(1),
            current_quantum: 0,
            last_pid: None,
        }
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: ScheduleKind) {
        self.kind = kind;
        self.did_context_switch();
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// A quantum of zero is clamped to one.
    pub fn set_quantum(&mut self, quantum: usize) {
        self.quantum = quantum.max(1);
    }

    pub fn orders_by_priority(&self) -> bool {
        self.kind == ScheduleKind::Priority
    }

    pub fn did_cycle(&mut self, pid: Pid) {
        if self.last_pid == Some(pid) {
            self.current_quantum += 1;
        } else {
            self.current_quantum = 1;
        }
        self.last_pid = Some(pid);
    }

    pub fn did_context_switch(&mut self) {
        self.current_quantum = 0;
        self.last_pid = None;
    }

    pub fn should_context_switch(&self) -> bool {
        match self.kind {
            ScheduleKind::RoundRobin => self.current_quantum >= self.quantum,
            ScheduleKind::FirstComeFirstServed | ScheduleKind::Priority => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_round_robin_switches_after_quantum() {
        let mut policy = SchedulePolicy::new(ScheduleKind::RoundRobin, 6);

        for _ in 0..5 {
            policy.did_cycle(0);
            assert!(!policy.should_context_switch());
        }
        policy.did_cycle(0);
        assert!(policy.should_context_switch());

        policy.did_context_switch();
        assert!(!policy.should_context_switch());
    }

    #[test]
    fn test_schedule_round_robin_restarts_count_on_new_pid() {
        let mut policy = SchedulePolicy::new(ScheduleKind::RoundRobin, 2);
        policy.did_cycle(0);
        policy.did_cycle(1);
        assert!(!policy.should_context_switch());
        policy.did_cycle(1);
        assert!(policy.should_context_switch());
    }

    #[test]
    fn test_schedule_fcfs_and_priority_never_switch() {
        for kind in [ScheduleKind::FirstComeFirstServed, ScheduleKind::Priority] {
            let mut policy = SchedulePolicy::new(kind, 1);
            for _ in 0..20 {
                policy.did_cycle(0);
            }
            assert!(!policy.should_context_switch());
        }
    }

    #[test]
    fn test_schedule_kind_from_str() {
        assert_eq!("RR".parse::<ScheduleKind>(), Ok(ScheduleKind::RoundRobin));
        assert_eq!("fcfs".parse::<ScheduleKind>(), Ok(ScheduleKind::FirstComeFirstServed));
        assert_eq!("priority".parse::<ScheduleKind>(), Ok(ScheduleKind::Priority));
        assert!("lottery".parse::<ScheduleKind>().is_err());
    }

    #[test]
    fn test_schedule_quantum_clamped() {
        let mut policy = SchedulePolicy::new(ScheduleKind::RoundRobin, 0);
        assert_eq!(policy.quantum(), 1);
        policy.set_quantum(3);
        assert_eq!(policy.quantum(), 3);
    }
}

//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall).
//!
//! A 200 Hz loop does not need hard real time, but on a loaded host the
//! default scheduler can starve the tick long enough to distort the
//! position integration; FIFO priority and locked pages keep the jitter
//! bounded. Applied once per process; every failure is a warning, never
//! fatal.

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>) {
    use libc::{
        MCL_CURRENT, MCL_FUTURE, SCHED_FIFO, mlockall, sched_get_priority_max,
        sched_get_priority_min, sched_param, sched_setscheduler,
    };
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    RT_ONCE.get_or_init(|| {
        let rc = unsafe { mlockall(MCL_CURRENT | MCL_FUTURE) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            eprintln!(
                "Warning: mlockall failed: {err}; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'"
            );
        } else {
            eprintln!("RT: memory locked (current|future)");
        }

        let (min, max) = unsafe {
            let min = sched_get_priority_min(SCHED_FIFO);
            let max = sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let prio_val = prio.unwrap_or(min).clamp(min, max);
        let param = sched_param {
            sched_priority: prio_val,
        };
        let rc = unsafe { sched_setscheduler(0, SCHED_FIFO, &param) };
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            eprintln!(
                "Warning: sched_setscheduler(SCHED_FIFO, prio={prio_val}) failed: {err}; hint: needs CAP_SYS_NICE or root"
            );
        } else {
            eprintln!("RT: SCHED_FIFO priority {prio_val}");
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(rt: bool, _prio: Option<i32>) {
    if rt {
        eprintln!("Warning: --rt is only supported on Linux; continuing without it.");
    }
}

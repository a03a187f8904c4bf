/*!
 * Error Tests
 * Serialization, conversions and diagnostics of runtime errors
 */

use lwp_kernel::core::SerializableError;
use lwp_kernel::{
    CallError, ExitReason, Fault, HeapError, KernelError, MailboxError, Pid, ProcessError,
    ProcessState, Value,
};
use miette::Diagnostic;
use pretty_assertions::assert_eq;

#[test]
fn test_process_error_json_shape() {
    let error = ProcessError::NoSuchProcess(Pid(12));
    let json = serde_json::to_value(&error).unwrap();

    assert_eq!(json["error_type"], "no_such_process");
    let back: ProcessError = serde_json::from_value(json).unwrap();
    assert_eq!(back, error);
}

#[test]
fn test_state_transition_error_roundtrip() {
    let error = ProcessError::InvalidStateTransition {
        pid: Pid(3),
        from: ProcessState::Dead,
        to: ProcessState::Ready,
    };
    let json = serde_json::to_string(&error).unwrap();
    assert_eq!(serde_json::from_str::<ProcessError>(&json).unwrap(), error);
}

#[test]
fn test_call_error_roundtrip() {
    let errors = vec![
        CallError::Timeout {
            pid: Pid(1),
            timeout_ms: 250,
        },
        CallError::Exited {
            pid: Pid(2),
            reason: "normal".into(),
        },
        CallError::Rejected(ProcessError::MailboxFull {
            pid: Pid(5),
            capacity: 8,
        }),
    ];

    for error in errors {
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(serde_json::from_str::<CallError>(&json).unwrap(), error);
    }
}

#[test]
fn test_exit_reason_serialization() {
    let reasons = vec![
        ExitReason::Normal,
        ExitReason::NoProc,
        ExitReason::Fault("boom".into()),
        ExitReason::shutdown("maintenance"),
        ExitReason::custom(Value::Int(3)),
    ];
    for reason in reasons {
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(serde_json::from_str::<ExitReason>(&json).unwrap(), reason);
    }
    assert_eq!(
        ExitReason::shutdown("maintenance").shutdown_reason(),
        Some("maintenance")
    );
}

#[test]
fn test_kernel_error_conversions() {
    let err: KernelError = ProcessError::LimitReached { limit: 4 }.into();
    assert!(matches!(err, KernelError::Process(_)));

    let err: KernelError = MailboxError::Full { capacity: 2 }.into();
    assert!(matches!(err, KernelError::Mailbox(_)));

    let err: KernelError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    let serializable = SerializableError::from(err);
    assert_eq!(serializable.error_type, "io_error");
    assert_eq!(serializable.details.as_deref(), Some("kernel::io_error"));

    // Transparent variants report the inner diagnostic code
    let err: KernelError = ProcessError::NoSuchProcess(Pid(3)).into();
    let serializable = SerializableError::from(err);
    assert_eq!(serializable.error_type, "process_error");
    assert_eq!(
        serializable.details.as_deref(),
        Some("process::no_such_process")
    );
}

#[test]
fn test_diagnostic_codes() {
    let code = |d: &dyn Diagnostic| d.code().map(|c| c.to_string());

    assert_eq!(
        code(&ProcessError::NoSuchProcess(Pid(1))),
        Some("process::no_such_process".into())
    );
    assert_eq!(
        code(&CallError::Timeout {
            pid: Pid(1),
            timeout_ms: 1
        }),
        Some("call::timeout".into())
    );
    assert_eq!(code(&Fault::new("bad input")), Some("process::fault".into()));

    // Transparent variants forward the inner code
    let err = KernelError::Process(ProcessError::NameTaken("db".into()));
    assert_eq!(code(&err), Some("process::name_taken".into()));
    assert!(err.help().is_some());
}

#[test]
fn test_heap_error_display() {
    let err = HeapError::OutOfMemory {
        requested: 64,
        limit: 32,
        used: 16,
    };
    assert!(err.to_string().contains("64"));
    assert!(matches!(
        ProcessError::from(err),
        ProcessError::ResourceExhausted(_)
    ));
}

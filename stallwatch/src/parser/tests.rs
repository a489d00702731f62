use super::*;
use crate::domain::{HeaderDefect, JvmVendor, LockRef, StackFrame};

const OPENJDK_DUMP: &str = r#"2025-09-21 03:30:13
Full thread dump OpenJDK 64-Bit Server VM (11.0.16+8 mixed mode, sharing):

"main" #1 prio=5 os_prio=0 cpu=0.00ms elapsed=0.00s tid=0x0000e91980193800 nid=0x2d runnable  [0x0000e919527fe000]
   java.lang.Thread.State: RUNNABLE

"Thread-0" #10 prio=5 os_prio=0 cpu=106.01ms elapsed=0.25s tid=0x0000e91980193800 nid=0x2e in Object.wait()  [0x0000e919527fe000]
   java.lang.Thread.State: WAITING (on object monitor)
	at java.lang.Object.wait(java.base@11.0.16/Native Method)
	- waiting on <0x00000000e2e2f648> (a java.lang.Object)
	at com.example.threadanalyzer.ThreadAnalyzerApplication.lambda$null$2(ThreadAnalyzerApplication.java:96)
	- locked <0x00000000e2e2f648> (a java.lang.Object)

"BlockedThread" #11 daemon prio=5 os_prio=0 cpu=106.01ms elapsed=0.25s tid=0x0000e91980193800 nid=0x2f waiting for monitor entry  [0x0000e919527fe000]
   java.lang.Thread.State: BLOCKED (on object monitor)
	at com.example.threadanalyzer.ThreadAnalyzerApplication.lambda$null$2(ThreadAnalyzerApplication.java:96)
	- waiting to lock <0x00000000e2e2f700> (a java.lang.Object)

   Locked ownable synchronizers:
	- <0x00000000e2e2f800> (a java.util.concurrent.locks.ReentrantLock$NonfairSync)

"VM Thread" os_prio=0 cpu=2.12ms elapsed=0.30s tid=0x0000e91980100000 nid=0x20 runnable

JNI global refs: 15, weak refs: 0
"#;

const IBM_DUMP: &str = r#"2025-09-21 03:42:28
Full thread dump IBM Semeru Runtime Open Edition 17.0.8.0 (build 17.0.8+7, JRE 17.0.8 Linux amd64-64-Bit ) (J9 0.42 +)

"main" J9VMThread:0x0000000000402000, omrthread:0x00007f8000001000, JavaThread:0x00007f8000001000, state:R, prio=5, OSCPUS=0.00%, tid=0x00007f8000001000, nid=0x1, fnid=0x1, stack:0x00007f8000001000-0x00007f8000002000, core:false, Java callstack:
	at com.example.threadanalyzer.ThreadAnalyzerApplication.main(ThreadAnalyzerApplication.java:100)

"BlockedThread" J9VMThread:0x0000000000403000, omrthread:0x00007f8000003000, JavaThread:0x00007f8000003000, state:B, prio=5, OSCPUS=0.00%, tid=0x00007f8000003000, nid=0x3, fnid=0x3, stack:0x00007f8000003000-0x00007f8000004000, core:false, Java callstack:
	at com.example.threadanalyzer.ThreadAnalyzerApplication.lambda$null$2(ThreadAnalyzerApplication.java:96)
	- waiting on <0x00000000e0000000> (a java.lang.Object)
	at java.lang.Object.wait(java.base@17.0.8/Native Method)
"#;

#[test]
fn test_parse_minimal_two_thread_dump() {
    let raw = "\"main\" #1 prio=5 ... java.lang.Thread.State: RUNNABLE\n\n\"worker-1\" #12 daemon ... java.lang.Thread.State: BLOCKED (on object monitor)\n\tat com.example.Foo.bar(Foo.java:10)\n";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads.len(), 2);
    assert_eq!(snapshot.skipped_count(), 0);
    assert_eq!(snapshot.captured_at, None);

    let main = &snapshot.threads[0];
    assert_eq!(main.name, "main");
    assert_eq!(main.state, ThreadState::Runnable);
    assert!(main.stack.is_empty());

    let worker = &snapshot.threads[1];
    assert_eq!(worker.name, "worker-1");
    assert_eq!(worker.state, ThreadState::Blocked);
    assert!(worker.daemon);
    assert_eq!(worker.stack, vec![StackFrame::new("com.example.Foo.bar(Foo.java:10)")]);
}

#[test]
fn test_parse_openjdk_dump() {
    let snapshot = parse(OPENJDK_DUMP).unwrap();

    assert_eq!(snapshot.vendor, JvmVendor::OpenJdk);
    assert_eq!(
        snapshot.runtime.as_deref(),
        Some("OpenJDK 64-Bit Server VM (11.0.16+8 mixed mode, sharing)")
    );
    assert_eq!(snapshot.captured_at.unwrap().to_string(), "2025-09-21 03:30:13");
    assert_eq!(snapshot.threads.len(), 4);

    let waiting = &snapshot.threads[1];
    assert_eq!(waiting.name, "Thread-0");
    assert_eq!(waiting.id, Some(10));
    assert_eq!(waiting.nid, Some(0x2e));
    assert_eq!(waiting.state, ThreadState::Waiting);
    assert_eq!(waiting.state_detail.as_deref(), Some("on object monitor"));
    assert_eq!(waiting.stack.len(), 2);
    assert_eq!(waiting.stack[0].as_str(), "java.lang.Object.wait(java.base@11.0.16/Native Method)");
    assert_eq!(
        waiting.waiting_on,
        Some(LockRef::new("0x00000000e2e2f648").with_class("java.lang.Object"))
    );
    assert!(waiting.holds(&LockRef::new("0x00000000e2e2f648")));

    let blocked = &snapshot.threads[2];
    assert_eq!(blocked.state, ThreadState::Blocked);
    assert!(blocked.daemon);
    assert_eq!(blocked.waiting_on.as_ref().map(|l| l.id.as_str()), Some("0x00000000e2e2f700"));
    assert!(blocked.holds(&LockRef::new("0x00000000e2e2f800")));
    assert_eq!(blocked.held_locks.len(), 1);
}

#[test]
fn test_thread_without_state_line_uses_header_status() {
    let snapshot = parse(OPENJDK_DUMP).unwrap();
    let vm_thread = &snapshot.threads[3];

    assert_eq!(vm_thread.name, "VM Thread");
    assert_eq!(vm_thread.id, None);
    assert_eq!(vm_thread.state, ThreadState::Runnable);
    assert!(vm_thread.stack.is_empty());
}

#[test]
fn test_parse_ibm_dump() {
    let snapshot = parse(IBM_DUMP).unwrap();

    assert_eq!(snapshot.vendor, JvmVendor::Ibm);
    assert_eq!(snapshot.threads.len(), 2);

    let main = &snapshot.threads[0];
    assert_eq!(main.state, ThreadState::Runnable);
    assert_eq!(main.stack.len(), 1);

    let blocked = &snapshot.threads[1];
    assert_eq!(blocked.name, "BlockedThread");
    assert_eq!(blocked.state, ThreadState::Blocked);
    assert_eq!(blocked.nid, Some(3));
    assert_eq!(blocked.stack.len(), 2);
    assert_eq!(blocked.waiting_on.as_ref().map(|l| l.id.as_str()), Some("0x00000000e0000000"));
}

#[test]
fn test_malformed_stanzas_are_counted_not_merged() {
    let raw = "\
\"good-1\" #1 prio=5
   java.lang.Thread.State: RUNNABLE
\tat a.B.c(B.java:1)

\"broken #2 prio=5
   java.lang.Thread.State: BLOCKED
\tat x.Y.z(Y.java:9)

\"\" #3 prio=5
\tat x.Y.z(Y.java:9)

\"good-2\" #4 prio=5
   java.lang.Thread.State: WAITING (parking)
";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads.len(), 2);
    assert_eq!(snapshot.skipped_count(), 2);
    assert_eq!(snapshot.skipped[0], SkippedStanza { line: 5, defect: HeaderDefect::UnterminatedName });
    assert_eq!(snapshot.skipped[1], SkippedStanza { line: 9, defect: HeaderDefect::EmptyName });

    // The broken stanza's frame must not leak into good-1
    let good = &snapshot.threads[0];
    assert_eq!(good.state, ThreadState::Runnable);
    assert_eq!(good.stack, vec![StackFrame::new("a.B.c(B.java:1)")]);
    assert_eq!(snapshot.threads[1].state, ThreadState::Waiting);
}

#[test]
fn test_empty_input_fails() {
    assert_eq!(parse(""), Err(ParseError::NoThreadsFound { skipped: 0 }));
    assert_eq!(
        parse("2025-09-21 03:30:13\nnothing to see here\n"),
        Err(ParseError::NoThreadsFound { skipped: 0 })
    );
}

#[test]
fn test_only_malformed_stanzas_fails() {
    let raw = "\"unterminated #1\n\"\" #2 prio=5\n";
    assert_eq!(parse(raw), Err(ParseError::NoThreadsFound { skipped: 2 }));
}

#[test]
fn test_duplicate_names_are_kept() {
    let raw = "\
\"pool-worker\" #20 prio=5
   java.lang.Thread.State: BLOCKED (on object monitor)
\"pool-worker\" #21 prio=5
   java.lang.Thread.State: RUNNABLE
";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads.len(), 2);
    assert_eq!(snapshot.threads_named("pool-worker").count(), 2);
    assert_eq!(snapshot.threads[0].id, Some(20));
    assert_eq!(snapshot.threads[1].id, Some(21));
}

#[test]
fn test_unknown_state_token_keeps_stanza() {
    let raw = "\"odd\" #5 prio=5\n   java.lang.Thread.State: HIBERNATING\n\tat a.B.c(B.java:1)\n";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads[0].state, ThreadState::Unknown);
    assert_eq!(snapshot.threads[0].stack.len(), 1);
}

#[test]
fn test_waiting_on_dropped_for_runnable_thread() {
    let raw = "\"spinner\" #6 prio=5\n   java.lang.Thread.State: RUNNABLE\n\tat a.B.c(B.java:1)\n\t- waiting to lock <0x1> (a java.lang.Object)\n";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads[0].waiting_on, None);
}

#[test]
fn test_deadlock_trailer_ends_scan() {
    let raw = "\
\"Thread-1\" #13 prio=5 nid=0x3 waiting for monitor entry
   java.lang.Thread.State: BLOCKED (on object monitor)
\tat Deadlock.b(Deadlock.java:20)

Found one Java-level deadlock:
=============================
\"Thread-1\":
  waiting to lock monitor 0x00007f, (object 0x000000076ab62208, a java.lang.Object),
Java stack information for the threads listed above:
===================================================
\"Thread-1\":
\tat Deadlock.b(Deadlock.java:20)

Found 1 deadlock.
";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads.len(), 1);
    assert_eq!(snapshot.skipped_count(), 0);
    assert_eq!(snapshot.threads[0].stack.len(), 1);
}

#[test]
fn test_crlf_line_endings() {
    let raw = "\"main\" #1 prio=5\r\n   java.lang.Thread.State: RUNNABLE\r\n\tat a.B.c(B.java:1)\r\n";
    let snapshot = parse(raw).unwrap();

    assert_eq!(snapshot.threads[0].state, ThreadState::Runnable);
    assert_eq!(snapshot.threads[0].stack[0].as_str(), "a.B.c(B.java:1)");
}

#[test]
fn test_relocked_monitor_listed_once() {
    let raw = "\"holder\" #7 prio=5\n   java.lang.Thread.State: RUNNABLE\n\
               \tat a.B.inner(B.java:2)\n\t- locked <0x1>\n\
               \tat a.B.outer(B.java:1)\n\t- locked <0x1> (a java.lang.Object)\n";
    let holder = &parse(raw).unwrap().threads[0];

    assert_eq!(holder.held_locks.len(), 1);
    let lock = holder.held_locks.iter().next().unwrap();
    assert_eq!(lock.class_name.as_deref(), Some("java.lang.Object"));
}

#[test]
fn test_raw_name_ending_in_backslash() {
    let raw = "\"C:\\\" #2 prio=5\n   java.lang.Thread.State: BLOCKED\n\n\"b\" #3 prio=5\n   java.lang.Thread.State: RUNNABLE\n";
    let snapshot = parse(raw).unwrap();

    let names: Vec<&str> = snapshot.threads.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["C:\\", "b"]);
    assert_eq!(snapshot.skipped_count(), 0);
}

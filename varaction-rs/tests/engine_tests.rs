//! End-to-end scenarios over the evaluator: increment forms, IF/ELSE,
//! store write failures, timers, string buffers.

use std::cell::RefCell;
use std::rc::Rc;

use varaction::error::Error;
use varaction::runner::RecordingRunner;
use varaction::scheduler::SharedScheduler;
use varaction::strbuf::StrRef;
use varaction::timer::{TimerBackend, TimerHandle, TimerMode, TimerSpec};
use varaction::{Config, Context, MemoryStore, NodeId, Op, Statement, TypeSpec, Value};

fn ctx() -> Context {
    Context::default().with_runner(Box::new(RecordingRunner::default()))
}

fn local(ctx: &mut Context, store: &mut MemoryStore, name: &str, t: TypeSpec) -> NodeId {
    let id = ctx.new_identifier(store, name, true).unwrap();
    ctx.arena_mut().declare(t, id);
    id
}

// ── Increment / decrement ────────────────────────────────────────────────────

#[test]
fn post_then_pre_increment() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let x = local(&mut c, &mut store, "x", TypeSpec::Short);
    let a = c.arena_mut();
    let five = a.new_number("5");
    let init = a.create_variable(Op::Assign, Some(x), Some(five));
    let post = a.create_variable(Op::Inc, Some(x), None);
    let pre = a.create_variable(Op::Inc, None, Some(x));

    c.process_variable(&mut store, init).unwrap();

    c.process_variable(&mut store, post).unwrap();
    assert_eq!(c.value(post), Some(&Value::U16(5)));
    assert_eq!(c.value(x), Some(&Value::U16(6)));

    c.process_variable(&mut store, pre).unwrap();
    assert_eq!(c.value(pre), Some(&Value::U16(7)));
    assert_eq!(c.value(x), Some(&Value::U16(7)));
}

#[test]
fn decrement_sysvar_writes_back() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("n", 10u32);
    let n = c.new_identifier(&mut store, "n", false).unwrap();
    let dec = c.arena_mut().create_variable(Op::Dec, Some(n), None);
    c.process_variable(&mut store, dec).unwrap();
    assert_eq!(c.value(dec), Some(&Value::U32(10)));
    assert_eq!(store.value("n"), Some(&Value::U32(9)));
}

// ── IF / ELSE ────────────────────────────────────────────────────────────────

#[test]
fn if_true_runs_then_only() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let y = local(&mut c, &mut store, "y", TypeSpec::Short);
    let a = c.arena_mut();
    let cond = a.new_number("1");
    let one = a.new_number("1");
    let two = a.new_number("2");
    let then = a.create_variable(Op::Assign, Some(y), Some(one));
    let other = a.create_variable(Op::Assign, Some(y), Some(two));
    let stmt = a.new_if(cond, vec![Statement::expr(then)], Some(vec![Statement::expr(other)]));
    c.process_variable(&mut store, stmt).unwrap();
    assert_eq!(c.value(y), Some(&Value::U16(1)));
}

#[test]
fn if_false_without_else_does_nothing() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("y", 0u16);
    let y = c.new_identifier(&mut store, "y", false).unwrap();
    c.arena_mut().mark_lvalue(y);
    let a = c.arena_mut();
    let cond = a.new_number("0");
    let one = a.new_number("1");
    let then = a.create_variable(Op::Assign, Some(y), Some(one));
    let stmt = a.new_if(cond, vec![Statement::expr(then)], None);
    c.process_variable(&mut store, stmt).unwrap();
    assert_eq!(store.value("y"), Some(&Value::U16(0)));
    assert_eq!(store.writes(), 0);
}

#[test]
fn if_true_without_else_assigns() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("y", 0u16);
    let y = c.new_identifier(&mut store, "y", false).unwrap();
    c.arena_mut().mark_lvalue(y);
    let a = c.arena_mut();
    let cond = a.new_number("1");
    let one = a.new_number("1");
    let then = a.create_variable(Op::Assign, Some(y), Some(one));
    let stmt = a.new_if(cond, vec![Statement::expr(then)], None);
    c.process_variable(&mut store, stmt).unwrap();
    assert_eq!(store.value("y"), Some(&Value::U16(1)));
}

#[test]
fn if_false_runs_else() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let y = local(&mut c, &mut store, "y", TypeSpec::Short);
    let a = c.arena_mut();
    let three = a.new_number("3");
    let four = a.new_number("4");
    let cond = a.create_variable(Op::Gt, Some(three), Some(four));
    let one = a.new_number("1");
    let two = a.new_number("2");
    let then = a.create_variable(Op::Assign, Some(y), Some(one));
    let other = a.create_variable(Op::Assign, Some(y), Some(two));
    let stmt = a.new_if(cond, vec![Statement::expr(then)], Some(vec![Statement::expr(other)]));
    c.process_variable(&mut store, stmt).unwrap();
    assert_eq!(c.value(y), Some(&Value::U16(2)));
}

#[test]
fn failing_condition_skips_both_branches() {
    let runner = SharedRunner::default();
    let mut c = Context::default().with_runner(Box::new(runner.clone()));
    let mut store = MemoryStore::new();
    let a = c.arena_mut();
    let one = a.new_number("1");
    let zero = a.new_number("0");
    let cond = a.create_variable(Op::Div, Some(one), Some(zero));
    let stmt = a.new_if(
        cond,
        vec![Statement::script("echo then")],
        Some(vec![Statement::script("echo else")]),
    );
    assert!(c.process_variable(&mut store, stmt).is_err());
    assert!(runner.0.borrow().scripts.is_empty());
}

#[test]
fn nested_blocks_and_scripts() {
    let runner = SharedRunner::default();
    let mut c = Context::default().with_runner(Box::new(runner.clone()));
    let mut store = MemoryStore::new();
    let a = c.arena_mut();
    let yes = a.new_number("1");
    let inner = a.new_if(yes, vec![Statement::script("echo inner")], None);
    let outer_cond = a.new_number("1");
    let outer = a.new_if(
        outer_cond,
        vec![Statement::script("echo outer"), Statement::expr(inner)],
        None,
    );
    let action = c.add_block(vec![Statement::expr(outer), Statement::script("echo after")]);
    c.process_compound_statement(&mut store, action).unwrap();
    assert_eq!(
        runner.0.borrow().scripts,
        vec!["echo outer", "echo inner", "echo after"]
    );
}

#[derive(Clone, Default)]
struct SharedRunner(Rc<RefCell<RecordingRunner>>);

impl varaction::runner::ScriptRunner for SharedRunner {
    fn run(&mut self, script: &str) {
        self.0.borrow_mut().scripts.push(script.to_owned());
    }
}

// ── Store write failure ──────────────────────────────────────────────────────

#[test]
fn failed_write_back_keeps_in_memory_mutation() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("x", 10u16);
    let x = c.new_identifier(&mut store, "x", false).unwrap();
    store.fail_writes("x", libc::EACCES);
    let five = c.arena_mut().new_number("5");
    let add = c.arena_mut().create_variable(Op::PlusEquals, Some(x), Some(five));

    let err = c.process_variable(&mut store, add).unwrap_err();
    assert_eq!(err, Error::Store { code: libc::EACCES });
    assert_eq!(err.code(), libc::EACCES);
    assert_eq!(c.value(x), Some(&Value::U16(15)));
    assert_eq!(store.value("x"), Some(&Value::U16(10)));
}

#[test]
fn failed_read_propagates_store_code() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("x", 1u16);
    let x = c.new_identifier(&mut store, "x", false).unwrap();
    store.fail_reads("x", libc::EIO);
    let err = c.process_variable(&mut store, x).unwrap_err();
    assert_eq!(err.code(), libc::EIO);
}

#[test]
fn unknown_identifier_is_not_found() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let err = c.new_identifier(&mut store, "missing", false).unwrap_err();
    assert_eq!(err.code(), libc::ENOENT);
    assert!(c.symbols().sysvars().is_empty());
}

#[test]
fn sysvar_cache_survives_between_actions() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("t", 1u16);
    let first = c.new_identifier(&mut store, "t", false).unwrap();
    c.set_declarations(Vec::new());
    let second = c.new_identifier(&mut store, "t", false).unwrap();
    assert_eq!(first, second);
    assert_eq!(c.symbols().sysvars().len(), 1);
}

// ── Timers ───────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Call {
    Arm(u16, TimerSpec),
    Disarm(TimerHandle),
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Call>>>);

impl TimerBackend for Recorder {
    fn arm(&mut self, id: u16, spec: TimerSpec) -> varaction::Result<TimerHandle> {
        let mut calls = self.0.borrow_mut();
        calls.push(Call::Arm(id, spec));
        Ok(TimerHandle(calls.len() as u64))
    }

    fn disarm(&mut self, handle: TimerHandle) -> varaction::Result<()> {
        self.0.borrow_mut().push(Call::Disarm(handle));
        Ok(())
    }
}

fn timer_op(c: &mut Context, op: Op, id: &str, ms: Option<&str>) -> NodeId {
    let a = c.arena_mut();
    let id = a.new_number(id);
    let ms = ms.map(|m| a.new_number(m));
    a.create_variable(op, Some(id), ms)
}

#[test]
fn create_on_armed_id_replaces_timer() {
    let rec = Recorder::default();
    let mut c = ctx().with_timer_backend(Box::new(rec.clone()));
    let mut store = MemoryStore::new();

    let first = timer_op(&mut c, Op::CreateTimer, "4", Some("1500"));
    let second = timer_op(&mut c, Op::CreateTick, "4", Some("250"));
    c.process_variable(&mut store, first).unwrap();
    c.process_variable(&mut store, second).unwrap();
    assert_eq!(c.value(second), Some(&Value::U16(1)));

    let calls = rec.0.borrow();
    assert_eq!(
        *calls,
        vec![
            Call::Arm(4, TimerSpec::from_millis(1500, false)),
            Call::Disarm(TimerHandle(1)),
            Call::Arm(4, TimerSpec::from_millis(250, true)),
        ]
    );
}

#[test]
fn delete_unarmed_timer_is_not_found() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let del = timer_op(&mut c, Op::DeleteTimer, "9", None);
    let err = c.process_variable(&mut store, del).unwrap_err();
    assert_eq!(err.code(), libc::ENOENT);
    assert_eq!(c.value(del), Some(&Value::U16(0)));
}

#[test]
fn timer_ids_must_be_in_range() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let zero = timer_op(&mut c, Op::CreateTimer, "0", Some("10"));
    let high = timer_op(&mut c, Op::CreateTimer, "255", Some("10"));
    assert!(matches!(c.process_variable(&mut store, zero), Err(Error::NotFound(_))));
    assert!(matches!(c.process_variable(&mut store, high), Err(Error::NotFound(_))));
}

#[test]
fn latest_firing_wins() {
    let mut c = ctx();
    c.timer_fired(2);
    c.timer_fired(3);
    assert_eq!(c.active_timer(), 3);
}

#[test]
fn queued_mode_delivers_each_firing() {
    let (config, errs) = Config::load_str("/set timer_mode=queued\n/set timer_queue_depth=4");
    assert!(errs.is_empty(), "{errs:?}");
    assert_eq!(config.timer_mode, TimerMode::Queued);
    let mut c = Context::new(config).with_runner(Box::new(RecordingRunner::default()));
    let mut store = MemoryStore::new();

    let q = c.arena_mut().create_variable(Op::ActiveTimer, None, None);
    c.timer_fired(2);
    c.timer_fired(3);

    let mut seen = Vec::new();
    while c.next_timer_pass() != 0 {
        c.process_variable(&mut store, q).unwrap();
        if let Some(Value::U16(id)) = c.value(q) {
            seen.push(*id);
        }
    }
    assert_eq!(seen, vec![2, 3]);
}

#[test]
fn one_shot_slot_frees_after_firing() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let create = timer_op(&mut c, Op::CreateTimer, "5", Some("10"));
    c.process_variable(&mut store, create).unwrap();
    assert!(c.timers().is_armed(5));
    c.timer_fired(5);
    assert!(!c.timers().is_armed(5));
}

#[tokio::test(start_paused = true)]
async fn scheduler_drives_timer_queries() {
    let sched = SharedScheduler::new();
    let mut c = ctx().with_timer_backend(Box::new(sched.clone()));
    let mut store = MemoryStore::new();

    let tick = timer_op(&mut c, Op::CreateTick, "1", Some("100"));
    let once = timer_op(&mut c, Op::CreateTimer, "2", Some("250"));
    c.process_variable(&mut store, tick).unwrap();
    c.process_variable(&mut store, once).unwrap();

    let mut fired = Vec::new();
    for _ in 0..3 {
        for id in sched.wait_ready().await {
            c.timer_fired(id);
            fired.push(id);
        }
    }
    assert_eq!(fired, vec![1, 1, 2]);
    assert!(!c.timers().is_armed(2));
    assert!(c.timers().is_armed(1));
}

// ── Strings ──────────────────────────────────────────────────────────────────

#[test]
fn string_self_assignment() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let s = local(&mut c, &mut store, "s", TypeSpec::String);
    let hello = c.arena_mut().new_string("hello");
    let init = c.arena_mut().create_variable(Op::Assign, Some(s), Some(hello));
    let again = c.arena_mut().create_variable(Op::Assign, Some(s), Some(s));
    c.process_variable(&mut store, init).unwrap();
    c.process_variable(&mut store, again).unwrap();
    assert_eq!(c.value(s), Some(&Value::string("hello")));
}

#[test]
fn assignment_result_aliases_variable_buffer() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let s = local(&mut c, &mut store, "s", TypeSpec::String);
    let text = c.arena_mut().new_string("abc");
    let asg = c.arena_mut().create_variable(Op::Assign, Some(s), Some(text));
    c.process_variable(&mut store, asg).unwrap();
    match (c.value(s), c.value(asg)) {
        (Some(Value::Str(Some(a))), Some(Value::Str(Some(b)))) => assert!(StrRef::ptr_eq(a, b)),
        other => panic!("expected aliased strings, got {other:?}"),
    }
}

#[test]
fn capacity_grows_but_never_shrinks() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let s = local(&mut c, &mut store, "s", TypeSpec::String);
    let long = "z".repeat(40);
    let mut caps = Vec::new();
    for text in ["0123456789", "abc", long.as_str()] {
        let lit = c.arena_mut().new_string(text);
        let asg = c.arena_mut().create_variable(Op::Assign, Some(s), Some(lit));
        c.process_variable(&mut store, asg).unwrap();
        caps.push(c.value(s).map(Value::capacity).unwrap_or_default());
    }
    assert_eq!(caps, vec![32, 32, 41]);
}

#[test]
fn string_append_to_sysvar() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    store.insert("log", "a");
    let log = c.new_identifier(&mut store, "log", false).unwrap();
    let b = c.arena_mut().new_string("b");
    let app = c.arena_mut().create_variable(Op::PlusEquals, Some(log), Some(b));
    c.process_variable(&mut store, app).unwrap();
    c.process_variable(&mut store, app).unwrap();
    assert_eq!(store.value("log"), Some(&Value::string("abb")));
}

#[test]
fn comparison_of_strings_in_tree() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    let a = c.arena_mut();
    let l = a.new_string("apple");
    let r = a.new_string("banana");
    let lt = a.create_variable(Op::Lt, Some(l), Some(r));
    c.process_variable(&mut store, lt).unwrap();
    assert_eq!(c.value(lt), Some(&Value::U16(1)));
}

#[test]
fn to_string_with_oversized_format_width() {
    let mut c = ctx();
    let mut store = MemoryStore::new();
    for format in ["%99999999999999999999d", "%1000000000d"] {
        let a = c.arena_mut();
        let seven = a.new_number("7");
        let fmt = a.new_string(format);
        let cast = a.create_variable(Op::ToString, Some(seven), Some(fmt));
        c.process_variable(&mut store, cast).unwrap();
        let text = match c.value(cast) {
            Some(Value::Str(Some(s))) => s.to_vec(),
            other => panic!("expected a string, got {other:?}"),
        };
        assert_eq!(text.len(), 64);
        assert_eq!(text.last(), Some(&b'7'));
    }
}

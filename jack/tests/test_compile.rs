use std::collections::BTreeSet;

use jack::Segment;

#[test]
fn test_compile_square() {
    let square_jack = include_str!("square.jack");
    let square_vm = include_str!("square.vm");

    match jack::compile(square_jack) {
        Ok(vm_code) => {
            assert_eq!(vm_code, square_vm);
        }
        Err(err) => {
            panic!("{}", err)
        }
    }
}

/// Every declared name must be read and written through the
/// segment and slot its symbol table assigned.
#[test]
fn test_symbols_resolve_to_assigned_slots() {
    let source = "\
class Vars {
    static int s;
    field int f;

    method int use(int a) {
        var int v;
        let s = 1;
        let f = 2;
        let v = a;
        return v;
    }
}";

    let vm_code = match jack::compile(source) {
        Ok(vm_code) => vm_code,
        Err(err) => panic!("{}", err),
    };

    // Collect the (segment, index) pairs the compiler emitted for
    // variable accesses.
    let mut bindings = BTreeSet::new();
    for line in vm_code.lines() {
        let mut parts = line.split_whitespace();
        if !matches!(parts.next(), Some("push" | "pop")) {
            continue;
        }
        let segment = parts.next().and_then(Segment::parse);
        let index = parts.next().and_then(|index| index.parse::<u16>().ok());

        if let (Some(segment), Some(index)) = (segment, index) {
            match segment {
                Segment::Static | Segment::This | Segment::Argument | Segment::Local => {
                    bindings.insert((segment.to_string(), index));
                }
                _ => {}
            }
        }
    }

    // s is the only static, f the only field, v the only local.
    // a follows the receiver in the argument segment.
    let expected: BTreeSet<(String, u16)> = [
        ("argument", 0),
        ("argument", 1),
        ("local", 0),
        ("static", 0),
        ("this", 0),
    ]
    .into_iter()
    .map(|(segment, index)| (segment.to_string(), index))
    .collect();

    assert_eq!(bindings, expected);
}

use hostshare::layout::Schema;
use hostshare::runtime::{build_write_instructions, decode, encode, PartialValue, Value};

fn example() -> Schema {
    let c = Schema::structure("C", [("d", Schema::u32())]).unwrap();
    Schema::structure(
        "S",
        [("a", Schema::u32()), ("b", Schema::vec3f()), ("c", c)],
    )
    .unwrap()
}

#[test]
fn untouched_members_break_runs() {
    let partial = PartialValue::structure([
        ("a", PartialValue::from(1u32)),
        ("c", PartialValue::structure([("d", 2u32)])),
    ]);
    let instructions = build_write_instructions(&example(), &partial).unwrap();
    let ranges: Vec<_> = instructions.iter().map(|i| (i.offset, i.len())).collect();
    assert_eq!(ranges, vec![(0, 4), (28, 4)]);
}

#[test]
fn adjacent_members_merge_across_padding() {
    let partial = PartialValue::structure([
        ("a", PartialValue::from(1u32)),
        ("b", PartialValue::from([1.0f32, 2.0, 3.0])),
        ("c", PartialValue::structure([("d", 2u32)])),
    ]);
    let instructions = build_write_instructions(&example(), &partial).unwrap();
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].range(), 0..32);

    let full = Value::structure([
        ("a", Value::from(1u32)),
        ("b", Value::from([1.0f32, 2.0, 3.0])),
        ("c", Value::structure([("d", 2u32)])),
    ]);
    assert_eq!(instructions[0].data, encode(&example(), &full).unwrap());
}

#[test]
fn omitted_everything_writes_nothing() {
    let partial = PartialValue::structure([("c", PartialValue::structure::<&str, u32>([]))]);
    assert_eq!(build_write_instructions(&example(), &partial), Ok(vec![]));
}

#[test]
fn sparse_updates_match_full_writes() {
    let light = Schema::structure(
        "Light",
        [("position", Schema::vec3f()), ("intensity", Schema::f32())],
    )
    .unwrap();
    let schema = Schema::structure(
        "Scene",
        [
            ("time", Schema::f32()),
            ("lights", Schema::array(light, 4).unwrap()),
            ("exposure", Schema::f32()),
        ],
    )
    .unwrap();

    let light_value = |i: f32| {
        Value::structure([
            ("position", Value::from([i, i, i])),
            ("intensity", Value::from(i)),
        ])
    };
    let before = Value::structure([
        ("time", Value::from(0.0f32)),
        (
            "lights",
            Value::array((0..4).map(|i| light_value(i as f32))),
        ),
        ("exposure", Value::from(1.0f32)),
    ]);
    let mut bytes = encode(&schema, &before).unwrap();

    let partial = PartialValue::structure([
        (
            "lights",
            PartialValue::indexed([
                (3, PartialValue::structure([("intensity", 30.0f32)])),
                (1, PartialValue::from(light_value(10.0))),
                (2, PartialValue::from(light_value(20.0))),
            ]),
        ),
        ("exposure", PartialValue::from(2.0f32)),
    ]);
    let instructions = build_write_instructions(&schema, &partial).unwrap();

    // lights[1] and lights[2] are adjacent, lights[3].intensity bridges to exposure
    let ranges: Vec<_> = instructions.iter().map(|i| i.range()).collect();
    assert_eq!(ranges, vec![32..64, 76..84]);

    for instruction in &instructions {
        instruction.apply(&mut bytes).unwrap();
    }

    let mut third = light_value(3.0);
    if let Value::Struct(fields) = &mut third {
        fields.insert("intensity".into(), Value::from(30.0f32));
    }
    let after = Value::structure([
        ("time", Value::from(0.0f32)),
        (
            "lights",
            Value::array([light_value(0.0), light_value(10.0), light_value(20.0), third]),
        ),
        ("exposure", Value::from(2.0f32)),
    ]);
    assert_eq!(decode(&schema, &bytes), Ok(after));
}

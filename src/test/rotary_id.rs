use crate::net::RotaryIdGenerator;

#[test]
fn fresh_generator_yields_one() {
    let mut generator = RotaryIdGenerator::new();
    assert_eq!(generator.next_identifier(), 1);
}

#[test]
fn identifiers_increase_monotonically() {
    let mut generator = RotaryIdGenerator::new();
    for expected in 1..=5 {
        assert_eq!(generator.next_identifier(), expected);
    }
}

#[test]
fn reset_restarts_from_one() {
    let mut generator = RotaryIdGenerator::new();
    for _ in 0..4 {
        generator.next_identifier();
    }
    generator.reset();
    assert_eq!(generator.next_identifier(), 1);
}

#[test]
fn generator_wraps_to_zero_at_max() {
    let mut generator = RotaryIdGenerator::new();
    generator.set_identifier(u32::MAX);
    assert_eq!(generator.next_identifier(), 0);
    assert_eq!(generator.next_identifier(), 1);
}

#[test]
fn set_identifier_overrides_regardless_of_direction() {
    let mut generator = RotaryIdGenerator::new();
    for _ in 0..4 {
        generator.next_identifier();
    }
    generator.set_identifier(2);
    assert_eq!(generator.next_identifier(), 3);
    generator.set_identifier(100);
    assert_eq!(generator.next_identifier(), 101);
}

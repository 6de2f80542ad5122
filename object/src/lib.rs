mod value;
mod header;
mod objects;
mod visitor;

pub use value::{
    ObjectRef, SMALL_INTEGER_MAX, SMALL_INTEGER_MIN, Value, ValueError, ValueKind,
};
pub use header::{Header, HeaderFlags, ObjectKind};
pub use objects::{
    BlockData, Body, ClassData, ContextData, Dictionary, ExceptionData, HeapObject,
    MethodData, Selectors, selector_arity,
};
pub use visitor::Visitable;

#[cfg(test)]
mod tests {
    use super::*;

    // ── Value tagging ──────────────────────────────────────────────

    #[test]
    fn integer_round_trip() {
        for &n in &[
            0i64,
            1,
            -1,
            42,
            -42,
            1 << 40,
            -(1 << 40),
            SMALL_INTEGER_MAX,
            SMALL_INTEGER_MIN,
        ] {
            let v = Value::from_integer(n).unwrap();
            assert!(v.is_integer());
            assert!(v.is_immediate());
            assert!(!v.is_ref());
            assert_eq!(v.as_integer().unwrap(), n);
        }
    }

    #[test]
    fn integer_out_of_range_is_rejected() {
        assert_eq!(
            Value::from_integer(SMALL_INTEGER_MAX + 1),
            Err(ValueError::IntegerOutOfRange(SMALL_INTEGER_MAX + 1))
        );
        assert!(Value::from_integer(i64::MIN).is_err());
    }

    #[test]
    fn specials_are_distinct() {
        let all = [Value::NIL, Value::TRUE, Value::FALSE];
        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
            assert!(a.is_immediate());
        }
        assert_eq!(Value::NIL.kind(), ValueKind::Nil);
        assert_eq!(Value::TRUE.kind(), ValueKind::True);
        assert_eq!(Value::FALSE.kind(), ValueKind::False);
        assert_eq!(Value::default(), Value::NIL);
    }

    #[test]
    fn is_true_is_identity_only() {
        assert!(Value::TRUE.is_true());
        assert!(!Value::FALSE.is_true());
        assert!(!Value::NIL.is_true());
        assert!(!Value::from_integer(1).unwrap().is_true());
        assert!(!Value::from_ref(ObjectRef::new(1)).is_true());
        assert!(Value::from_bool(false).is_false());
    }

    #[test]
    fn float_round_trip_for_typical_values() {
        for &f in &[0.0f64, 1.0, -1.5, 3.25, 1024.0, 0.1f32 as f64, -2.5e10] {
            let v = Value::from_float(f);
            assert!(v.is_float());
            assert_eq!(v.as_float().unwrap(), f, "{f} did not round-trip");
        }
    }

    #[test]
    fn float_encoding_truncates_low_mantissa_bits() {
        let f = 0.1f64;
        let decoded = Value::from_float(f).as_float().unwrap();
        assert_eq!(decoded.to_bits(), f.to_bits() & !0b11);
        assert!((decoded - f).abs() < 1e-15);
        assert!(Value::from_float(f64::NAN).as_float().unwrap().is_nan());
        assert_eq!(
            Value::from_float(f64::INFINITY).as_float().unwrap(),
            f64::INFINITY
        );
    }

    #[test]
    fn nan_with_low_payload_stays_nan() {
        let signalling = f64::from_bits(0x7FF0_0000_0000_0001);
        assert!(signalling.is_nan());
        let decoded = Value::from_float(signalling).as_float().unwrap();
        assert!(decoded.is_nan());
        assert!(!decoded.is_infinite());
        let negative = f64::from_bits(0xFFF0_0000_0000_0002);
        assert!(Value::from_float(negative).as_float().unwrap().is_nan());
    }

    #[test]
    fn wrong_tag_is_a_domain_error() {
        let int = Value::from_integer(7).unwrap();
        assert!(matches!(
            int.as_float(),
            Err(ValueError::WrongTag { expected: "float", .. })
        ));
        assert!(int.as_ref().is_err());
        assert!(Value::NIL.as_integer().is_err());
        assert!(Value::from_float(1.0).as_integer().is_err());
    }

    #[test]
    fn ref_tagging() {
        let r = ObjectRef::new(1234);
        let v = Value::from_ref(r);
        assert!(v.is_ref());
        assert!(!v.is_immediate());
        assert_eq!(v.raw() & 0b11, 0);
        assert_eq!(v.as_ref().unwrap(), r);
        // Index zero is a valid reference, not nil.
        assert_ne!(Value::from_ref(ObjectRef::new(0)), Value::NIL);
    }

    #[test]
    fn every_value_has_exactly_one_kind() {
        let values = [
            Value::NIL,
            Value::TRUE,
            Value::FALSE,
            Value::from_integer(-3).unwrap(),
            Value::from_float(2.0),
            Value::from_ref(ObjectRef::new(9)),
        ];
        for v in values {
            let flags = [v.is_nil(), v.is_true(), v.is_false(), v.is_integer(), v.is_float(), v.is_ref()];
            assert_eq!(flags.iter().filter(|&&f| f).count(), 1, "{v:?}");
            assert_eq!(v.is_immediate(), !v.is_ref());
        }
    }

    // ── Header ─────────────────────────────────────────────────────

    #[test]
    fn header_forwarding_lifecycle() {
        let mut header = Header::new(Value::NIL);
        assert!(!header.is_moved());
        assert_eq!(header.forward(), None);

        header.set_forward(ObjectRef::new(5));
        assert!(header.is_moved());
        assert!(header.flags().contains(HeaderFlags::MOVED));
        assert_eq!(header.forward(), Some(ObjectRef::new(5)));

        header.reset_gc();
        assert!(!header.is_moved());
        assert_eq!(header.forward(), None);
    }

    // ── Objects ────────────────────────────────────────────────────

    #[test]
    fn selector_arity_follows_selector_shape() {
        assert_eq!(selector_arity("factorial"), 0);
        assert_eq!(selector_arity("+"), 1);
        assert_eq!(selector_arity("<="), 1);
        assert_eq!(selector_arity("at:"), 1);
        assert_eq!(selector_arity("at:put:"), 2);
        assert_eq!(selector_arity("on:do:"), 2);
        assert_eq!(selector_arity(""), 0);
    }

    #[test]
    fn kind_matches_body() {
        let obj = HeapObject::new(Value::NIL, Body::Array(vec![Value::NIL; 3]));
        assert_eq!(obj.kind(), ObjectKind::Array);
        assert_eq!(obj.as_array().map(Vec::len), Some(3));
        assert!(obj.as_string().is_none());
        assert_eq!(obj.footprint(), Header::WORDS + 1 + 3);
    }

    #[test]
    fn class_instance_size_is_flattened() {
        let class = ClassData::new("Point3D", Value::NIL, vec!["z".into()], 2);
        assert_eq!(class.instance_size, 3);
        assert!(class.methods.is_empty());
    }

    #[test]
    fn visit_edges_reports_every_reference() {
        let a = Value::from_ref(ObjectRef::new(1));
        let b = Value::from_ref(ObjectRef::new(2));
        let class = Value::from_ref(ObjectRef::new(3));
        let obj = HeapObject::new(
            class,
            Body::Array(vec![a, Value::from_integer(4).unwrap(), b]),
        );

        let mut seen = Vec::new();
        obj.visit_edges(&mut |v| seen.push(v));
        assert_eq!(seen, vec![class, a, Value::from_integer(4).unwrap(), b]);
    }

    #[test]
    fn visit_edges_mut_rewrites_context_links() {
        let old = Value::from_ref(ObjectRef::new(10));
        let new = Value::from_ref(ObjectRef::new(20));
        let mut obj = HeapObject::new(
            Value::NIL,
            Body::Context(ContextData {
                code: old,
                receiver: Value::NIL,
                temps: vec![old],
                stack: vec![old],
                stack_capacity: 4,
                pc: 0,
                sender: old,
                outer: Value::NIL,
                home: Value::NIL,
                depth: 1,
            }),
        );

        obj.visit_edges_mut(&mut |v| {
            if *v == old {
                *v = new;
            }
        });

        let ctx = obj.as_context().unwrap();
        assert_eq!(ctx.code, new);
        assert_eq!(ctx.temps, vec![new]);
        assert_eq!(ctx.stack, vec![new]);
        assert_eq!(ctx.sender, new);
        assert!(!ctx.is_block_context());
    }
}

// Property-based tests for scalar binding and per-axis constraints.

use proptest::prelude::*;

use pparam::{DimensionedParameter, Expr, Parameter, Type};

fn scalar(ty: Type) -> Parameter {
    Parameter::scalar(ty, "s").unwrap()
}

/// One write to a dimension: `true` sets the min, `false` the extent.
fn constraint_writes() -> impl Strategy<Value = Vec<(bool, i32)>> {
    prop::collection::vec((any::<bool>(), -1000i32..1000), 1..12)
}

proptest! {
    #[test]
    fn int32_round_trips(v in any::<i32>()) {
        let mut p = scalar(Type::int(32));
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<i32>().unwrap(), v);
    }

    #[test]
    fn int64_round_trips(v in any::<i64>()) {
        let mut p = scalar(Type::int(64));
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<i64>().unwrap(), v);
    }

    #[test]
    fn uint16_round_trips(v in any::<u16>()) {
        let mut p = scalar(Type::uint(16));
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<u16>().unwrap(), v);
    }

    #[test]
    fn float64_round_trips(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let mut p = scalar(Type::float(64));
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<f64>().unwrap(), v);
    }

    #[test]
    fn bool_round_trips(v in any::<bool>()) {
        let mut p = scalar(Type::bool());
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<bool>().unwrap(), v);
    }

    #[test]
    fn handle_bits_round_trip(v in any::<u64>()) {
        let mut p = scalar(Type::handle());
        p.set_scalar(v).unwrap();
        prop_assert_eq!(p.get_scalar::<u64>().unwrap(), v);
        prop_assert_eq!(p.handle_bits().unwrap(), v);
    }

    #[test]
    fn mismatched_scalar_access_fails(v in any::<i32>()) {
        let mut p = scalar(Type::int(32));
        p.set_scalar(v).unwrap();
        prop_assert!(p.get_scalar::<u32>().is_err());
        prop_assert!(p.get_scalar::<f32>().is_err());
        prop_assert!(p.set_scalar(v as i64).is_err());
        prop_assert_eq!(p.get_scalar::<i32>().unwrap(), v);
    }

    #[test]
    fn extent_reads_back(dims in 1usize..6, extent in -10_000i32..10_000) {
        let mut p = Parameter::buffer(Type::float(32), dims, "b").unwrap();
        let d = dims - 1;
        p.dim_mut(d).unwrap().set_extent(extent);
        prop_assert_eq!(p.dim(d).unwrap().extent(), Expr::int(extent));
        prop_assert_eq!(p.extent_constraint(d).unwrap(), Expr::int(extent));
    }

    #[test]
    fn out_of_range_axis_fails(dims in 1usize..6, extra in 0usize..4) {
        let p = Parameter::buffer(Type::float(32), dims, "b").unwrap();
        prop_assert!(p.dim(dims + extra).is_err());
        prop_assert!(p.min_constraint(dims + extra).is_err());
    }

    #[test]
    fn max_follows_latest_bounds(writes in constraint_writes()) {
        let mut p = Parameter::buffer(Type::int(32), 1, "b").unwrap();
        let mut min = None;
        let mut extent = None;
        for (is_min, v) in writes {
            let view = p.dim_mut(0).unwrap();
            if is_min {
                view.set_min(v);
                min = Some(v);
            } else {
                view.set_extent(v);
                extent = Some(v);
            }
        }
        let max = p.dim(0).unwrap().max();
        match (min, extent) {
            (Some(m), Some(e)) => {
                prop_assert_eq!(max, Expr::int(m) + Expr::int(e) - 1);
            }
            _ => prop_assert!(!max.defined()),
        }
    }

    #[test]
    fn copies_observe_every_write(min in any::<i32>(), align_log2 in 0u32..8) {
        let a = Parameter::buffer(Type::uint(8), 2, "im").unwrap();
        let mut b = a.clone();
        b.dim_mut(1).unwrap().set_min(min);
        b.set_host_alignment(1usize << align_log2).unwrap();
        prop_assert_eq!(a.dim(1).unwrap().min(), Expr::int(min));
        prop_assert_eq!(a.host_alignment().unwrap(), 1usize << align_log2);
        prop_assert!(a.same_as(&b));
    }
}

// Scenario tests for the parameter handle, dimension views and geometry.
//
// Each test drives the public API the way an authoring session would:
// declare, constrain, bind, then read back through a different handle.

use pparam::error::ParamError;
use pparam::{Buffer, DimensionedParameter, Expr, Parameter, Type};

#[test]
fn int32_scalar_round_trip() {
    let mut foo = Parameter::scalar(Type::int(32), "foo").unwrap();
    foo.set_scalar(42i32).unwrap();
    assert_eq!(foo.get_scalar::<i32>().unwrap(), 42);
    assert_eq!(foo.name().unwrap(), "foo");
    assert!(foo.is_explicit_name().unwrap());
    assert!(!foo.is_buffer().unwrap());
    assert_eq!(foo.dimensions().unwrap(), 0);
}

#[test]
fn buffer_extents_read_back_as_literals() {
    let mut buf = Parameter::buffer(Type::float(32), 2, "buf").unwrap();
    buf.dim_mut(0).unwrap().set_extent(100);
    buf.dim_mut(1).unwrap().set_extent(200);

    assert_eq!(buf.dimensions().unwrap(), 2);
    let extent = buf.dim(0).unwrap().extent();
    assert_eq!(extent.as_int(), Some(100));
    assert_eq!(extent.ty(), Some(Type::int(32)));
    assert_eq!(buf.extent_constraint(1).unwrap(), Expr::int(200));
}

#[test]
fn copies_share_mutation() {
    let p1 = Parameter::buffer(Type::float(32), 2, "shared").unwrap();
    let mut p2 = p1.clone();
    p2.dim_mut(0).unwrap().set_min(5);
    assert_eq!(p1.dim(0).unwrap().min().as_int(), Some(5));

    p2.set_host_alignment(32).unwrap();
    assert_eq!(p1.host_alignment().unwrap(), 32);

    let b = Buffer::new(Type::float(32), &[8, 8]).unwrap();
    p2.set_buffer(b.clone()).unwrap();
    assert!(p1.get_buffer().unwrap().same_as(&b));
}

#[test]
fn undefined_handle_only_answers_identity() {
    let p = Parameter::default();
    assert!(!p.defined());
    assert!(p.same_as(&Parameter::default()));
    assert_eq!(p.name().unwrap_err(), ParamError::Undefined);
    assert_eq!(p.ty().unwrap_err(), ParamError::Undefined);
    assert_eq!(p.dim(0).unwrap_err(), ParamError::Undefined);
    assert!(p.get_scalar::<i32>().is_err());
    assert!(p.get_buffer().is_err());
}

#[test]
fn identity_not_value_equality() {
    let a = Parameter::buffer(Type::uint(16), 3, "twin").unwrap();
    let b = Parameter::buffer(Type::uint(16), 3, "twin").unwrap();
    assert!(!a.same_as(&b));
    assert!(a.clone().same_as(&a));
    assert!(b.clone().same_as(&b));
}

#[test]
fn replacing_a_handle_releases_the_old_block() {
    let registry = pparam::InstanceRegistry::new();
    let mut p = Parameter::builder(Type::int(32), false, 0)
        .with_name("old")
        .with_registry(&registry)
        .build()
        .unwrap();
    let replacement = Parameter::builder(Type::int(32), false, 0)
        .with_name("new")
        .with_registry(&registry)
        .build()
        .unwrap();
    assert_eq!(registry.len(), 2);

    p = replacement.clone();
    assert_eq!(registry.len(), 1);
    assert_eq!(p.name().unwrap(), "new");
    assert_eq!(registry.instances()[0].name, "new");
}

#[test]
fn handle_scalar_reads_as_u64_only() {
    let mut h = Parameter::scalar(Type::handle(), "user_context").unwrap();
    h.set_scalar(0xffff_0000_1234_u64).unwrap();
    assert_eq!(h.get_scalar::<u64>().unwrap(), 0xffff_0000_1234);
    let err = h.get_scalar::<i32>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Can't access Param<handle> user_context as scalar of type int32"
    );
    // The literal form of a handle is its uint64 bit pattern.
    let e = h.get_scalar_expr().unwrap();
    assert_eq!(e.ty(), Some(Type::uint(64)));
    assert_eq!(e.as_uint(), Some(0xffff_0000_1234));
}

#[test]
fn scalar_expr_snapshots_the_value() {
    let mut p = Parameter::scalar(Type::float(32), "gain").unwrap();
    p.set_scalar(1.0f32).unwrap();
    let snapshot = p.get_scalar_expr().unwrap();
    p.set_scalar(3.0f32).unwrap();
    assert_eq!(snapshot.as_float(), Some(1.0));
    assert_eq!(p.get_scalar_expr().unwrap().as_float(), Some(3.0));
}

#[test]
fn scalar_address_reads_native_value() {
    let mut p = Parameter::scalar(Type::int(16), "s").unwrap();
    p.set_scalar(-300i16).unwrap();
    let addr = p.get_scalar_address().unwrap();
    // SAFETY: the slot is at least 8 bytes, aligned for u64, and no writer
    // runs concurrently in this test.
    let value = unsafe { addr.cast::<i16>().as_ptr().read() };
    assert_eq!(value, -300);
}

#[test]
fn zero_dimensional_buffer_is_rejected() {
    let err = Parameter::buffer(Type::float(32), 0, "empty").unwrap_err();
    assert!(matches!(err, ParamError::InvalidDeclaration { .. }));
    assert!(err.to_string().contains("at least one dimension"));
}

#[test]
fn geometry_of_an_image() {
    let mut im = Parameter::buffer(Type::uint(8), 3, "im").unwrap();
    im.dim_mut(0)
        .unwrap()
        .set_bounds(0, Expr::var("w"))
        .dim(1)
        .unwrap()
        .set_bounds(0, Expr::var("h"))
        .dim(2)
        .unwrap()
        .set_bounds(0, 3);

    assert_eq!(im.width().unwrap(), Expr::var("w"));
    assert_eq!(im.height().unwrap(), Expr::var("h"));
    assert_eq!(im.channels().unwrap().as_int(), Some(3));
    assert_eq!(im.right().unwrap(), Expr::int(0) + Expr::var("w") - 1);
    assert_eq!(im.bottom().unwrap().to_string(), "((0 + h) - 1)");
}

#[test]
fn failed_operations_leave_state_unchanged() {
    let mut p = Parameter::scalar(Type::uint(8), "u").unwrap();
    p.set_scalar(7u8).unwrap();
    assert!(p.set_scalar(1000i32).is_err());
    assert_eq!(p.get_scalar::<u8>().unwrap(), 7);
}

use tracing::info;

use crate::builtins::CallContext;
use crate::epair::atof;
use crate::error::RuntimeError;
use crate::world::Vec3;

fn length(v: Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Integral values print without a fraction; everything else as `%5.1f`.
pub fn format_float(f: f32) -> String {
    if f == f.trunc() && f.abs() < i32::MAX as f32 {
        format!("{}", f as i32)
    } else {
        format!("{f:5.1}")
    }
}

pub fn format_vector(v: Vec3) -> String {
    format!("'{:5.1} {:5.1} {:5.1}'", v[0], v[1], v[2])
}

/// Prints only in developer mode.
pub fn native_dprint(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    if ctx.developer {
        let text = ctx.string(0)?;
        info!(target: "qc", role = %ctx.vm.role(), "{}", text.trim_end_matches('\n'));
    }
    Ok(())
}

pub fn native_ftos(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let s = format_float(ctx.float(0));
    ctx.return_string(s)
}

pub fn native_vtos(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let s = format_vector(ctx.vector(0));
    ctx.return_string(s)
}

pub fn native_vlen(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let len = length(ctx.vector(0));
    ctx.return_float(len);
    Ok(())
}

/// Unit vector, or the zero vector for zero input.
pub fn native_normalize(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let v = ctx.vector(0);
    let len = length(v);
    let out = if len == 0.0 {
        [0.0; 3]
    } else {
        let inv = 1.0 / len;
        [v[0] * inv, v[1] * inv, v[2] * inv]
    };
    ctx.return_vector(out);
    Ok(())
}

pub fn native_floor(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let f = ctx.float(0).floor();
    ctx.return_float(f);
    Ok(())
}

pub fn native_ceil(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let f = ctx.float(0).ceil();
    ctx.return_float(f);
    Ok(())
}

pub fn native_fabs(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let f = ctx.float(0).abs();
    ctx.return_float(f);
    Ok(())
}

pub fn native_stof(ctx: &mut CallContext<'_>) -> Result<(), RuntimeError> {
    let f = atof(&ctx.string(0)?);
    ctx.return_float(f);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(-12.0), "-12");
        assert_eq!(format_float(0.5), "  0.5");
        assert_eq!(format_float(2.3), "  2.3");
    }

    #[test]
    fn test_format_vector() {
        assert_eq!(format_vector([1.0, -2.0, 30.5]), "'  1.0  -2.0  30.5'");
    }
}

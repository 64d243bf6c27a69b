use thiserror::Error;

/// Failure to evaluate a function at a given argument.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("function is singular at {at:?}")]
    Singular { at: Vec<f64> },
    #[error("function returned a non-finite value at {at:?}")]
    NonFinite { at: Vec<f64> },
}

/// A scalar function of one variable.
pub trait Function {
    fn value(&self, x: f64) -> Result<f64, EvalError>;
}

/// A scalar function that can also report its first derivative.
pub trait FunctionWithDerivative: Function {
    /// Returns `(f(x), f'(x))`.
    fn values(&self, x: f64) -> Result<(f64, f64), EvalError>;
}

/// A two-variable system F = grad(phi) whose Jacobian is the symmetric Hessian of phi.
pub trait SymmetricSystem2 {
    /// Returns the gradient and the Hessian packed as `[h11, h12, h22]`.
    fn values(&self, x: [f64; 2]) -> Result<([f64; 2], [f64; 3]), EvalError>;
}

/// Adapter turning a closure returning `(f, f')` into a [`FunctionWithDerivative`].
pub struct FnWithDerivative<F>(pub F);

impl<F> Function for FnWithDerivative<F>
where
    F: Fn(f64) -> (f64, f64),
{
    fn value(&self, x: f64) -> Result<f64, EvalError> {
        self.values(x).map(|(f, _)| f)
    }
}

impl<F> FunctionWithDerivative for FnWithDerivative<F>
where
    F: Fn(f64) -> (f64, f64),
{
    fn values(&self, x: f64) -> Result<(f64, f64), EvalError> {
        let (f, df) = (self.0)(x);
        if f.is_finite() && df.is_finite() {
            Ok((f, df))
        } else {
            Err(EvalError::NonFinite { at: vec![x] })
        }
    }
}

/// Evaluate `f` and reject non-finite values.
pub(crate) fn checked_value<F: Function + ?Sized>(f: &F, x: f64) -> Result<f64, EvalError> {
    let v = f.value(x)?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(EvalError::NonFinite { at: vec![x] })
    }
}

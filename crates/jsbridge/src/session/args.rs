use crate::value::Value;

/// One argument of [`Session::call_function`](crate::Session::call_function).
///
/// Named arguments are gathered, in order, into a single options object
/// passed after all positional ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Value),
    Named(String, Value),
}

/// Build a `[Arg; N]` from serializable values.
///
/// ```
/// let args = jsbridge::args![1, "two", limit = 10].unwrap();
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::core::result::Result::<[$crate::Arg; 0], $crate::Error>::Ok([])
    };
    ($($tokens:tt)+) => {{
        (|| -> ::core::result::Result<_, $crate::Error> {
            Ok($crate::__jsbridge_args_internal!(@array [] $($tokens)+))
        })()
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __jsbridge_args_internal {
    (@array [$($out:expr,)*]) => {
        [$($out,)*]
    };
    (@array [$($out:expr,)*] , $($rest:tt)*) => {
        $crate::__jsbridge_args_internal!(@array [$($out,)*] $($rest)*)
    };
    (@array [$($out:expr,)*] $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::__jsbridge_args_internal!(
            @array
            [
                $($out,)*
                $crate::Arg::Named(
                    ::std::string::String::from(stringify!($name)),
                    $crate::Value::from_serde(&$value)?,
                ),
            ]
            $($($rest)*)?
        )
    };
    (@array [$($out:expr,)*] $value:expr $(, $($rest:tt)*)?) => {
        $crate::__jsbridge_args_internal!(
            @array
            [
                $($out,)*
                $crate::Arg::Positional($crate::Value::from_serde(&$value)?),
            ]
            $($($rest)*)?
        )
    };
}

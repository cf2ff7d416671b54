/// Async counterpart to the standard library's `TryFrom<T>` trait.
///
/// Used where building a value needs I/O on the compio runtime, such as
/// loading a config file from a path.
pub trait AsyncTryFrom<T>: Sized {
    /// The error type that can occur during conversion.
    type Error;

    /// Performs the fallible asynchronous conversion from `T` to `Self`.
    #[allow(async_fn_in_trait)]
    async fn async_try_from(value: T) -> Result<Self, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NumberWrapper(i32);

    impl AsyncTryFrom<String> for NumberWrapper {
        type Error = std::num::ParseIntError;

        async fn async_try_from(value: String) -> Result<Self, Self::Error> {
            let number = value.parse::<i32>()?;
            Ok(NumberWrapper(number))
        }
    }

    #[test]
    fn test_async_try_from_success() {
        futures::executor::block_on(async {
            let wrapper = NumberWrapper::async_try_from("42".to_string())
                .await
                .unwrap();
            assert_eq!(wrapper.0, 42);
        });
    }

    #[test]
    fn test_async_try_from_failure() {
        futures::executor::block_on(async {
            let result = NumberWrapper::async_try_from("not_a_number".to_string()).await;
            assert!(result.is_err());
        });
    }
}

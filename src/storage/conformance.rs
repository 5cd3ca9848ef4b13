//! Behaviour every [`Driver`] must share, run by each driver's own tests.

use std::future::Future;

use super::error::DriverError;
use super::traits::Driver;
use crate::converter::ConversionError;

const HELLO: &[u8] = b"Hello";
const HELLO2: &[u8] = b"Hello2";
const HELLO3: &[u8] = b"Hello3";

/// Run the whole suite, creating a fresh driver per check.
pub(crate) async fn run_all<D, F, Fut>(mut make: F)
where
    D: Driver,
    F: FnMut() -> Fut,
    Fut: Future<Output = D>,
{
    write_and_count(make().await).await;
    peek(make().await).await;
    poll(make().await).await;
    remove(make().await).await;
    mutate(make().await).await;
    mutate_is_all_or_nothing(make().await).await;
    closed(make().await).await;
}

async fn fill<D: Driver>(driver: &mut D, blobs: &[&[u8]]) {
    for blob in blobs {
        assert!(driver.write(blob.to_vec()).await.unwrap());
    }
}

async fn write_and_count<D: Driver>(mut driver: D) {
    assert_eq!(driver.count().await.unwrap(), 0);
    fill(&mut driver, &[HELLO, HELLO, HELLO]).await;
    assert_eq!(driver.count().await.unwrap(), 3);
    driver.close().await;
}

async fn peek<D: Driver>(mut driver: D) {
    assert!(driver.peek(None).await.unwrap().is_empty());
    assert!(driver.peek(Some(1)).await.unwrap().is_empty());

    fill(&mut driver, &[HELLO, HELLO2, HELLO3]).await;

    assert_eq!(driver.peek(Some(1)).await.unwrap(), vec![HELLO.to_vec()]);
    assert_eq!(
        driver.peek(Some(2)).await.unwrap(),
        vec![HELLO.to_vec(), HELLO2.to_vec()]
    );
    assert_eq!(driver.peek(None).await.unwrap().len(), 3);
    assert_eq!(driver.peek(Some(10)).await.unwrap().len(), 3);
    assert!(driver.peek(Some(0)).await.unwrap().is_empty());

    // Peeking never mutates.
    assert_eq!(driver.count().await.unwrap(), 3);
    driver.close().await;
}

async fn poll<D: Driver>(mut driver: D) {
    assert_eq!(driver.poll().await.unwrap(), None);

    fill(&mut driver, &[HELLO, HELLO2]).await;
    assert_eq!(driver.poll().await.unwrap(), Some(HELLO.to_vec()));
    assert_eq!(driver.count().await.unwrap(), 1);
    assert_eq!(driver.poll().await.unwrap(), Some(HELLO2.to_vec()));
    assert_eq!(driver.count().await.unwrap(), 0);
    assert_eq!(driver.poll().await.unwrap(), None);
    driver.close().await;
}

async fn remove<D: Driver>(mut driver: D) {
    assert_eq!(driver.remove(None).await.unwrap(), 0);

    fill(&mut driver, &[HELLO, HELLO2, HELLO3]).await;
    assert_eq!(driver.remove(Some(1)).await.unwrap(), 1);
    assert_eq!(driver.peek(Some(1)).await.unwrap(), vec![HELLO2.to_vec()]);

    assert_eq!(driver.remove(Some(0)).await.unwrap(), 0);
    assert_eq!(driver.count().await.unwrap(), 2);

    // A limit beyond the size removes what is there.
    assert_eq!(driver.remove(Some(5)).await.unwrap(), 2);
    assert_eq!(driver.count().await.unwrap(), 0);

    fill(&mut driver, &[HELLO, HELLO2, HELLO3]).await;
    assert_eq!(driver.remove(Some(2)).await.unwrap(), 2);
    assert_eq!(driver.poll().await.unwrap(), Some(HELLO3.to_vec()));

    fill(&mut driver, &[HELLO, HELLO2, HELLO2]).await;
    assert_eq!(driver.remove(None).await.unwrap(), 3);
    assert_eq!(driver.count().await.unwrap(), 0);
    driver.close().await;
}

async fn mutate<D: Driver>(mut driver: D) {
    let suffix = |input: &[u8]| -> Result<Vec<u8>, ConversionError> {
        let mut out = input.to_vec();
        out.extend_from_slice(b"Mutated");
        Ok(out)
    };
    assert_eq!(driver.mutate(&suffix).await.unwrap(), 0);

    fill(&mut driver, &[HELLO, HELLO2]).await;
    assert_eq!(driver.mutate(&suffix).await.unwrap(), 2);

    let peeked = driver.peek(None).await.unwrap();
    assert_eq!(peeked, vec![b"HelloMutated".to_vec(), b"Hello2Mutated".to_vec()]);

    // Order survives a write after the mutation.
    fill(&mut driver, &[HELLO3]).await;
    assert_eq!(driver.poll().await.unwrap(), Some(b"HelloMutated".to_vec()));
    driver.close().await;
}

async fn mutate_is_all_or_nothing<D: Driver>(mut driver: D) {
    fill(&mut driver, &[HELLO, HELLO2, HELLO3]).await;

    let fails_on_second = |input: &[u8]| -> Result<Vec<u8>, ConversionError> {
        if input == HELLO2 {
            return Err(ConversionError::new("refusing Hello2"));
        }
        Ok(b"changed".to_vec())
    };

    let err = driver.mutate(&fails_on_second).await.unwrap_err();
    assert!(matches!(err, DriverError::Mapper(_)), "unexpected error: {err:?}");
    assert_eq!(
        driver.peek(None).await.unwrap(),
        vec![HELLO.to_vec(), HELLO2.to_vec(), HELLO3.to_vec()]
    );
    driver.close().await;
}

async fn closed<D: Driver>(mut driver: D) {
    fill(&mut driver, &[HELLO]).await;
    driver.close().await;
    driver.close().await;

    let identity = |input: &[u8]| -> Result<Vec<u8>, ConversionError> { Ok(input.to_vec()) };

    assert!(matches!(driver.write(HELLO.to_vec()).await, Err(DriverError::Closed)));
    assert!(matches!(driver.count().await, Err(DriverError::Closed)));
    assert!(matches!(driver.peek(None).await, Err(DriverError::Closed)));
    assert!(matches!(driver.poll().await, Err(DriverError::Closed)));
    assert!(matches!(driver.remove(None).await, Err(DriverError::Closed)));
    assert!(matches!(driver.mutate(&identity).await, Err(DriverError::Closed)));
}

use std::{
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use byteorder::{BigEndian, WriteBytesExt};

use crate::ser::Serialize;

/// Seconds since the [`UNIX_EPOCH`], as stored in packets.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u32);

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl From<Timestamp> for SystemTime {
    fn from(value: Timestamp) -> Self {
        UNIX_EPOCH + Duration::from_secs(u64::from(value.0))
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: SystemTime) -> Result<Self, Self::Error> {
        let duration = value
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TooFarBackSnafu.build())?;
        let val: u32 = duration
            .as_secs()
            .try_into()
            .map_err(|_| TooFarIntoTheFutureSnafu.build())?;
        Ok(Self(val))
    }
}

/// Error when trying to convert a [`SystemTime`] into a [`Timestamp`].
#[derive(Debug, snafu::Snafu)]
pub enum TimestampError {
    #[snafu(display("time was before 1970-01-01 00:00:00"))]
    TooFarBack,
    #[snafu(display("time is more than u32::MAX seconds into the future"))]
    TooFarIntoTheFuture,
}

impl Timestamp {
    /// Returns the current time, saturating at the bounds of the format.
    pub fn now() -> Self {
        match SystemTime::now().try_into() {
            Ok(ts) => ts,
            Err(TimestampError::TooFarBack) => Self(0),
            Err(TimestampError::TooFarIntoTheFuture) => Self(u32::MAX),
        }
    }

    pub fn as_secs(self) -> u32 {
        self.0
    }

    pub fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Adds `secs` seconds, saturating at `u32::MAX`.
    pub fn saturating_add(self, secs: u32) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl Serialize for Timestamp {
    fn to_writer<W: std::io::Write>(&self, writer: &mut W) -> crate::errors::Result<()> {
        writer.write_u32::<BigEndian>(self.0)?;
        Ok(())
    }

    fn write_len(&self) -> usize {
        4
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for Timestamp {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            any::<u32>().prop_map(Timestamp::from_secs).boxed()
        }
    }

    #[test]
    fn test_system_time() {
        let ts = Timestamp::from_secs(1_500_000_000);
        let st: SystemTime = ts.into();
        assert_eq!(Timestamp::try_from(st).unwrap(), ts);
        assert_eq!(ts.to_bytes().unwrap(), vec![0x59, 0x68, 0x2f, 0x00]);
        assert_eq!(ts.saturating_add(u32::MAX).as_secs(), u32::MAX);
    }
}

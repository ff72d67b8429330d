mod media;

pub(crate) use self::media::MediaRow;

use uuid::Uuid;

/// 生成 DICOM UID（`2.25.` + UUID 的十进制表示）
pub fn new_dicom_uid() -> String {
    format!("2.25.{}", Uuid::new_v4().as_u128())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dicom_uid_shape() {
        let uid = new_dicom_uid();
        assert!(uid.starts_with("2.25."));
        assert!(uid.len() <= 64);
        assert!(uid[5..].chars().all(|c| c.is_ascii_digit()));
        assert_ne!(uid, new_dicom_uid());
    }
}

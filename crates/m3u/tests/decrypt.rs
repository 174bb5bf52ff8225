use lumen_m3u::{decrypt, encrypt, parse, DecryptError};

const RECIPE: &str =
    "hunter2|00112233445566778899aabbccddeeff|0f0e0d0c0b0a09080706050403020100|1000";
const WRONG_RECIPE: &str =
    "hunter3|00112233445566778899aabbccddeeff|0f0e0d0c0b0a09080706050403020100|1000";

#[test]
fn decrypt_openssl_fixture() {
    let encrypted = include_bytes!("fixtures/channels.m3u.enc");
    let expected = include_str!("fixtures/channels.m3u");

    let decrypted = decrypt(encrypted, RECIPE).unwrap();
    assert_eq!(decrypted, expected);

    let entries = parse(&decrypted);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "World News");
    assert_eq!(entries[0].group, "News");
    assert_eq!(entries[0].logo, "https://img.example.com/news.png");
    assert_eq!(entries[1].name, "Arena 1");
    assert_eq!(entries[1].url, "https://live.example.com/arena1.m3u8");
}

#[test]
fn decrypt_wrong_password() {
    let encrypted = include_bytes!("fixtures/channels.m3u.enc");
    assert_eq!(
        decrypt(encrypted, WRONG_RECIPE),
        Err(DecryptError::CipherMismatch)
    );
}

#[test]
fn decrypt_malformed_recipe() {
    let encrypted = include_bytes!("fixtures/channels.m3u.enc");
    assert!(matches!(
        decrypt(encrypted, "hunter2|not-hex|0f0e|1000"),
        Err(DecryptError::MalformedRecipe(_))
    ));
}

#[test]
fn encrypt_round_trip() {
    let playlists = [
        "",
        "#EXTM3U\n",
        "#EXTINF:-1 group-title=\"频道\",中文台\nhttp://x/zh\n",
        include_str!("fixtures/channels.m3u"),
    ];
    for plain in playlists {
        let encrypted = encrypt(plain.as_bytes(), RECIPE).unwrap();
        assert_eq!(encrypted.len() % 16, 0);
        assert_eq!(decrypt(&encrypted, RECIPE).unwrap(), plain);
    }
}

#[test]
fn encrypt_matches_openssl_fixture() {
    let plain = include_bytes!("fixtures/channels.m3u");
    let encrypted = encrypt(plain, RECIPE).unwrap();
    assert_eq!(encrypted, include_bytes!("fixtures/channels.m3u.enc"));
}

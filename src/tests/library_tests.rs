use super::{content_req, one_chunk, setup_store, upload};
use crate::models::library::ImageGroup;
use crate::services::library_service::{FolderCreate, FolderUpdate, VersionCreate, VersionUpdate};
use crate::services::store::{StoreError, StoreService};

async fn seed_version(service: &StoreService, name: &str) -> i64 {
    service
        .create_version(VersionCreate {
            library_name: name.into(),
            version_number: "1.0".into(),
            banner_image_id: None,
        })
        .await
        .unwrap()
        .id
}

fn folder_req(name: &str, version_id: i64, parent_id: Option<i64>) -> FolderCreate {
    FolderCreate {
        folder_name: name.into(),
        version_id,
        parent_id,
        banner_image_id: None,
        logo_image_id: None,
        content_ids: None,
    }
}

#[test]
fn image_groups_map_to_fixed_storage_prefixes() {
    assert_eq!(ImageGroup::from_code(1), Some(ImageGroup::Logo));
    assert_eq!(ImageGroup::from_code(2), Some(ImageGroup::Banner));
    assert_eq!(ImageGroup::from_code(3), Some(ImageGroup::Version));
    assert_eq!(ImageGroup::from_code(0), None);
    assert_eq!(ImageGroup::from_code(4), None);

    assert_eq!(ImageGroup::Logo.storage_prefix(), "images/logos");
    assert_eq!(ImageGroup::Banner.storage_prefix(), "images/banners");
    assert_eq!(ImageGroup::Version.storage_prefix(), "images/libversions");
}

#[tokio::test]
async fn unmapped_image_group_is_a_construction_error() {
    let (service, _dir) = setup_store().await;
    let err = service
        .upload_layout_image(4, "stray.png", one_chunk(b"png".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidImageGroup(4)));
}

#[tokio::test]
async fn image_upload_lands_under_its_group_path() {
    let (service, dir) = setup_store().await;
    let image = service
        .upload_layout_image(1, "crest.png", one_chunk(b"logo bytes".to_vec()))
        .await
        .unwrap();
    assert_eq!(image.image_group, 1);
    assert!(dir.path().join("images/logos/crest.png").exists());
}

#[tokio::test]
async fn duplicate_image_name_within_a_group_is_rejected() {
    let (service, dir) = setup_store().await;
    let first = service
        .upload_layout_image(1, "crest.png", one_chunk(b"first payload".to_vec()))
        .await
        .unwrap();

    let err = service
        .upload_layout_image(1, "crest.png", one_chunk(b"second payload".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FileAlreadyExists(name) if name == "crest.png"));

    // The first upload's payload is untouched.
    let bytes = std::fs::read(dir.path().join("images/logos/crest.png")).unwrap();
    assert_eq!(&bytes[..], b"first payload");

    // The same name under another group is a separate file; deleting it
    // leaves the logo's payload and row alone.
    let banner = service
        .upload_layout_image(2, "crest.png", one_chunk(b"banner payload".to_vec()))
        .await
        .unwrap();
    service.delete_layout_image(banner.id).await.unwrap();
    assert!(dir.path().join("images/logos/crest.png").exists());
    service.get_layout_image(first.id).await.unwrap();
}

#[tokio::test]
async fn deleting_a_version_cascades_its_folders() {
    let (service, _dir) = setup_store().await;
    let version_id = seed_version(&service, "Main").await;
    let root = service
        .create_folder(folder_req("Root", version_id, None))
        .await
        .unwrap();
    let child = service
        .create_folder(folder_req("Child", version_id, Some(root.folder.id)))
        .await
        .unwrap();

    service.delete_version(version_id).await.unwrap();

    assert!(matches!(
        service.get_folder(root.folder.id).await.unwrap_err(),
        StoreError::FolderNotFound(_)
    ));
    assert!(matches!(
        service.get_folder(child.folder.id).await.unwrap_err(),
        StoreError::FolderNotFound(_)
    ));
}

#[tokio::test]
async fn deleting_an_image_clears_references_without_cascading() {
    let (service, _dir) = setup_store().await;
    let logo = service
        .upload_layout_image(1, "logo.png", one_chunk(b"l".to_vec()))
        .await
        .unwrap();
    let banner = service
        .upload_layout_image(3, "banner.png", one_chunk(b"b".to_vec()))
        .await
        .unwrap();

    let version = service
        .create_version(VersionCreate {
            library_name: "Main".into(),
            version_number: "1.0".into(),
            banner_image_id: Some(banner.id),
        })
        .await
        .unwrap();
    let mut req = folder_req("Root", version.id, None);
    req.logo_image_id = Some(logo.id);
    let folder = service.create_folder(req).await.unwrap();

    service.delete_layout_image(logo.id).await.unwrap();
    service.delete_layout_image(banner.id).await.unwrap();

    // The referencing rows survive with the references nulled.
    let folder = service.get_folder(folder.folder.id).await.unwrap();
    assert_eq!(folder.folder.logo_image_id, None);
    let version = service.get_version(version.id).await.unwrap();
    assert_eq!(version.banner_image_id, None);
}

#[tokio::test]
async fn unknown_banner_reference_is_rejected() {
    let (service, _dir) = setup_store().await;
    let err = service
        .create_version(VersionCreate {
            library_name: "Main".into(),
            version_number: "1.0".into(),
            banner_image_id: Some(999),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownReference(_)));
}

#[tokio::test]
async fn reparenting_onto_a_descendant_is_rejected() {
    let (service, _dir) = setup_store().await;
    let version_id = seed_version(&service, "Main").await;
    let a = service
        .create_folder(folder_req("A", version_id, None))
        .await
        .unwrap();
    let b = service
        .create_folder(folder_req("B", version_id, Some(a.folder.id)))
        .await
        .unwrap();
    let c = service
        .create_folder(folder_req("C", version_id, Some(b.folder.id)))
        .await
        .unwrap();

    let err = service
        .update_folder(
            a.folder.id,
            FolderUpdate {
                parent_id: Some(Some(c.folder.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FolderCycle(_)));

    // Self-parenting is the degenerate cycle.
    let err = service
        .update_folder(
            a.folder.id,
            FolderUpdate {
                parent_id: Some(Some(a.folder.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FolderCycle(_)));

    // A legal reparent still works: C directly under A.
    let moved = service
        .update_folder(
            c.folder.id,
            FolderUpdate {
                parent_id: Some(Some(a.folder.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.folder.parent_id, Some(a.folder.id));
}

#[tokio::test]
async fn build_assembles_the_nested_tree() {
    let (service, _dir) = setup_store().await;
    let version_id = seed_version(&service, "Main").await;
    let other_version = seed_version(&service, "Other").await;

    upload(&service, "guide.pdf", b"guide").await;
    let content = service
        .create_content(content_req("Guide", "guide.pdf"))
        .await
        .unwrap();

    let root = service
        .create_folder(folder_req("Root", version_id, None))
        .await
        .unwrap();
    let mut child_req = folder_req("Child", version_id, Some(root.folder.id));
    child_req.content_ids = Some(vec![content.record.id]);
    let child = service.create_folder(child_req).await.unwrap();
    // A folder in another version must not leak into this build.
    service
        .create_folder(folder_req("Elsewhere", other_version, None))
        .await
        .unwrap();

    let build = service.build_library(version_id).await.unwrap();
    assert_eq!(build.version.id, version_id);
    assert_eq!(build.folders.len(), 1);

    let built_root = &build.folders[0];
    assert_eq!(built_root.id, root.folder.id);
    assert!(built_root.contents.is_empty());
    assert_eq!(built_root.subfolders.len(), 1);

    let built_child = &built_root.subfolders[0];
    assert_eq!(built_child.id, child.folder.id);
    assert!(built_child.subfolders.is_empty());
    assert_eq!(built_child.contents.len(), 1);
    assert_eq!(built_child.contents[0].title, "Guide");
    assert_eq!(built_child.contents[0].file_name, "guide.pdf");
}

#[tokio::test]
async fn build_of_unknown_version_fails_clearly() {
    let (service, _dir) = setup_store().await;
    let err = service.build_library(42).await.unwrap_err();
    assert!(matches!(err, StoreError::VersionNotFound(42)));
}

#[tokio::test]
async fn version_update_can_clear_the_banner() {
    let (service, _dir) = setup_store().await;
    let banner = service
        .upload_layout_image(3, "v.png", one_chunk(b"v".to_vec()))
        .await
        .unwrap();
    let version = service
        .create_version(VersionCreate {
            library_name: "Main".into(),
            version_number: "1.0".into(),
            banner_image_id: Some(banner.id),
        })
        .await
        .unwrap();

    let updated = service
        .update_version(
            version.id,
            VersionUpdate {
                banner_image_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.banner_image_id, None);
    assert_eq!(updated.library_name, "Main");
}

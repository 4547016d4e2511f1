use super::{
    response, transport::FormData, upscale_client::await_result, Api, ACCEPT_IMAGE, ACCEPT_JSON,
};
use crate::{
    error::Result,
    imaging,
    models::{
        non_blank, EraseRequest, ImageInput, ImageResult, InpaintRequest, OutpaintRequest,
        RemoveBackgroundRequest, ReplaceBackgroundRequest, SearchRecolorRequest,
        SearchReplaceRequest,
    },
};
use image::GrayImage;

#[derive(Clone)]
pub struct EditClient {
    api: Api,
}

impl EditClient {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn base_form(&self, field: &str, image: &ImageInput) -> FormData {
        FormData::new()
            .file(
                field,
                &image.file_name(field),
                image.format.mime(),
                image.bytes.clone(),
            )
            .text("output_format", self.api.config().output_format)
    }

    fn with_mask(form: FormData, mask: &GrayImage) -> Result<FormData> {
        let bytes = imaging::encode_mask_png(mask)?;
        Ok(form.file("mask", "mask.png", "image/png", bytes))
    }

    async fn submit(&self, path: &str, form: FormData) -> Result<ImageResult> {
        let response = self.api.post_form(path, form, ACCEPT_IMAGE).await?;
        response::expect_image(response)
    }

    pub async fn remove_background(&self, request: RemoveBackgroundRequest) -> Result<ImageResult> {
        log::info!(
            "Removing background from {}x{} image",
            request.image.width,
            request.image.height
        );
        let form = self.base_form("image", &request.image);
        self.submit("edit/remove-background", form).await
    }

    pub async fn inpaint(&self, request: InpaintRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!(
            "Inpainting {}x{} image",
            request.image.width,
            request.image.height
        );

        let form = self
            .base_form("image", &request.image)
            .text("prompt", request.prompt.trim());
        let form = Self::with_mask(form, &request.mask)?
            .text_opt("negative_prompt", non_blank(&request.negative_prompt))
            .text_opt("grow_mask", request.grow_mask)
            .text_opt("seed", request.seed);
        self.submit("edit/inpaint", form).await
    }

    pub async fn outpaint(&self, request: OutpaintRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!(
            "Outpainting left={} right={} up={} down={}",
            request.left,
            request.right,
            request.up,
            request.down
        );

        let form = self
            .base_form("image", &request.image)
            .text("prompt", request.prompt.trim())
            .text("left", request.left)
            .text("right", request.right)
            .text("up", request.up)
            .text("down", request.down)
            .text_opt("creativity", request.creativity)
            .text_opt("seed", request.seed);
        self.submit("edit/outpaint", form).await
    }

    /// Plain replacement answers directly; the relight variant is a job that
    /// has to be polled like a creative upscale.
    pub async fn replace_background(
        &self,
        request: ReplaceBackgroundRequest,
    ) -> Result<ImageResult> {
        request.validate()?;
        log::info!(
            "Replacing background{}",
            if request.relight { " with relight" } else { "" }
        );

        let form = self
            .base_form("subject_image", &request.subject_image)
            .text("background_prompt", request.background_prompt.trim())
            .text_opt("foreground_prompt", non_blank(&request.foreground_prompt))
            .text_opt("negative_prompt", non_blank(&request.negative_prompt))
            .text_opt("preserve_original_subject", request.preserve_original_subject)
            .text_opt(
                "light_source_direction",
                request.light_source_direction.map(|d| d.as_str()),
            )
            .text_opt("light_source_strength", request.light_source_strength)
            .text_opt("seed", request.seed);

        if request.relight {
            let response = self.api.post_form(request.path(), form, ACCEPT_JSON).await?;
            let job = response::expect_job(response)?;
            log::info!("Relight accepted as job {}", job.id);
            await_result(&self.api, &job.id).await
        } else {
            self.submit(request.path(), form).await
        }
    }

    pub async fn search_and_replace(&self, request: SearchReplaceRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!("Searching for '{}' to replace", request.search_prompt.trim());

        let form = self
            .base_form("image", &request.image)
            .text("search_prompt", request.search_prompt.trim())
            .text("prompt", request.prompt.trim())
            .text_opt("negative_prompt", non_blank(&request.negative_prompt))
            .text_opt("seed", request.seed);
        self.submit("edit/search-and-replace", form).await
    }

    pub async fn search_and_recolor(&self, request: SearchRecolorRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!("Recoloring '{}'", request.select_prompt.trim());

        let form = self
            .base_form("image", &request.image)
            .text("select_prompt", request.select_prompt.trim())
            .text("prompt", request.prompt.trim())
            .text_opt("negative_prompt", non_blank(&request.negative_prompt))
            .text_opt("seed", request.seed);
        self.submit("edit/search-and-recolor", form).await
    }

    pub async fn erase(&self, request: EraseRequest) -> Result<ImageResult> {
        request.validate()?;
        log::info!("Erasing masked region");

        let form = self.base_form("image", &request.image);
        let form = Self::with_mask(form, &request.mask)?
            .text_opt("grow_mask", request.grow_mask)
            .text_opt("seed", request.seed);
        self.submit("edit/erase", form).await
    }
}
